use super::CallError;
use crate::http::HttpClient;
use crate::scenario::Operation;
use serde_json::{json, Value};

pub const ENDPOINT: &str = "/api/graphql";

/// The query document and the root field a valid response must carry under `data`.
pub fn query_for(operation: Operation) -> (String, &'static str) {
    match operation {
        Operation::ListSongs => (
            "query { musicas { id nome artista } }".to_string(),
            "musicas",
        ),
        Operation::ListUsers => (
            "query { usuarios { id nome idade } }".to_string(),
            "usuarios",
        ),
        Operation::UserPlaylists { user_id } => (
            format!(
                "query {{ playlistsPorUsuario(usuarioId: {}) {{ id nome usuarioId usuarioNome }} }}",
                user_id
            ),
            "playlistsPorUsuario",
        ),
        Operation::PlaylistSongs { playlist_id } => (
            format!(
                "query {{ musicasDaPlaylist(playlistId: {}) {{ id nome musicas {{ id nome artista }} }} }}",
                playlist_id
            ),
            "musicasDaPlaylist",
        ),
        Operation::GetSong { song_id } => (
            format!("query {{ musicaPorId(id: {}) {{ id nome artista }} }}", song_id),
            "musicaPorId",
        ),
    }
}

/// A response passes when it is `200 OK` and `data.<root>` is present.
pub fn classify(
    status: u16,
    body: &str,
    root: &str,
    operation: Operation,
) -> Result<(), CallError> {
    if status != 200 {
        return Err(CallError::status(status, operation));
    }

    let parsed: Value =
        serde_json::from_str(body).map_err(|_| CallError::InvalidResponse(body.to_string()))?;

    match parsed.get("data").and_then(|data| data.get(root)) {
        Some(_) => Ok(()),
        None => Err(CallError::InvalidResponse(parsed.to_string())),
    }
}

pub async fn execute(http: &HttpClient, operation: Operation) -> Result<u64, CallError> {
    let (query, root) = query_for(operation);

    let response = http
        .client()
        .post(http.url(ENDPOINT))
        .header("Accept", "application/json")
        .json(&json!({ "query": query }))
        .send()
        .await?;

    let status = response.status().as_u16();
    let body = response.text().await?;

    classify(status, &body, root, operation)?;
    Ok(body.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_embeds_user_id() {
        let (query, root) = query_for(Operation::UserPlaylists { user_id: 42 });
        assert!(query.contains("playlistsPorUsuario(usuarioId: 42)"));
        assert!(query.contains("usuarioNome"));
        assert_eq!(root, "playlistsPorUsuario");
    }

    #[test]
    fn test_classify_accepts_data_root() {
        let body = r#"{"data":{"musicas":[{"id":"1","nome":"A","artista":"B"}]}}"#;
        assert!(classify(200, body, "musicas", Operation::ListSongs).is_ok());

        // An empty list is still a valid answer.
        let empty = r#"{"data":{"usuarios":[]}}"#;
        assert!(classify(200, empty, "usuarios", Operation::ListUsers).is_ok());
    }

    #[test]
    fn test_classify_rejects_errors_payload() {
        let body = r#"{"errors":[{"message":"boom"}]}"#;
        let err = classify(200, body, "musicas", Operation::ListSongs).unwrap_err();
        assert!(err.to_string().starts_with("Invalid response:"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_classify_rejects_non_json_and_bad_status() {
        assert!(matches!(
            classify(200, "<html>", "musicas", Operation::ListSongs),
            Err(CallError::InvalidResponse(_))
        ));
        let err = classify(503, "", "playlistsPorUsuario", Operation::UserPlaylists { user_id: 9 })
            .unwrap_err();
        assert_eq!(err.to_string(), "Status code: 503 for user 9");
    }
}
