use super::CallError;
use crate::http::HttpClient;
use crate::scenario::Operation;

pub const ENDPOINT: &str = "/api/ws";
pub const NAMESPACE: &str = "http://streaming.com/music/soap";

/// The request element placed in the envelope body.
pub fn body_for(operation: Operation) -> String {
    match operation {
        Operation::ListSongs => "<mus:listarMusicasRequest/>".to_string(),
        Operation::ListUsers => "<mus:listarUsuariosRequest/>".to_string(),
        Operation::UserPlaylists { user_id } => format!(
            "<mus:listarPlaylistsPorUsuarioRequest>\n         <mus:usuarioId>{}</mus:usuarioId>\n      </mus:listarPlaylistsPorUsuarioRequest>",
            user_id
        ),
        Operation::PlaylistSongs { playlist_id } => format!(
            "<mus:listarMusicasDaPlaylistRequest>\n         <mus:playlistId>{}</mus:playlistId>\n      </mus:listarMusicasDaPlaylistRequest>",
            playlist_id
        ),
        Operation::GetSong { song_id } => format!(
            "<mus:buscarMusicaPorIdRequest>\n         <mus:musicaId>{}</mus:musicaId>\n      </mus:buscarMusicaPorIdRequest>",
            song_id
        ),
    }
}

pub fn envelope(operation: Operation) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"
                  xmlns:mus="{}">
   <soapenv:Header/>
   <soapenv:Body>
      {}
   </soapenv:Body>
</soapenv:Envelope>"#,
        NAMESPACE,
        body_for(operation)
    )
}

/// Text a successful response body must contain.
pub fn marker(operation: Operation) -> &'static str {
    match operation {
        Operation::ListSongs => "musicas",
        Operation::ListUsers => "usuarios",
        Operation::UserPlaylists { .. } => "playlists",
        Operation::PlaylistSongs { .. } => "playlist",
        Operation::GetSong { .. } => "musica",
    }
}

pub fn classify(status: u16, body: &[u8], operation: Operation) -> Result<(), CallError> {
    let needle = marker(operation).as_bytes();
    let found = body.windows(needle.len()).any(|w| w == needle);

    if status == 200 && found {
        Ok(())
    } else {
        Err(CallError::status(status, operation))
    }
}

pub async fn execute(http: &HttpClient, operation: Operation) -> Result<u64, CallError> {
    let response = http
        .client()
        .post(http.url(ENDPOINT))
        .header("Content-Type", "text/xml; charset=utf-8")
        .header("SOAPAction", "")
        .body(envelope(operation))
        .send()
        .await?;

    let status = response.status().as_u16();
    let body = response.bytes().await?;

    classify(status, &body, operation)?;
    Ok(body.len() as u64)
}
