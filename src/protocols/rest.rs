use super::{check_status, CallError};
use crate::http::HttpClient;
use crate::scenario::{Operation, ResponseCheck};

pub fn path_for(operation: Operation) -> String {
    match operation {
        Operation::ListSongs => "/api/musicas".to_string(),
        Operation::ListUsers => "/api/usuarios".to_string(),
        Operation::UserPlaylists { user_id } => format!("/api/playlists/usuario/{}", user_id),
        Operation::PlaylistSongs { playlist_id } => format!("/api/playlists/{}/musicas", playlist_id),
        Operation::GetSong { song_id } => format!("/api/musicas/{}", song_id),
    }
}

/// Returns the length of the response body on success.
pub async fn execute(
    http: &HttpClient,
    check: ResponseCheck,
    operation: Operation,
) -> Result<u64, CallError> {
    let response = http
        .client()
        .get(http.url(&path_for(operation)))
        .header("Content-Type", "application/json")
        .header("Accept", "application/json")
        .send()
        .await?;

    let status = response.status().as_u16();
    let body = response.bytes().await?;

    check_status(check, status, operation)?;
    Ok(body.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(path_for(Operation::ListSongs), "/api/musicas");
        assert_eq!(path_for(Operation::ListUsers), "/api/usuarios");
        assert_eq!(
            path_for(Operation::UserPlaylists { user_id: 12 }),
            "/api/playlists/usuario/12"
        );
        assert_eq!(
            path_for(Operation::PlaylistSongs { playlist_id: 3 }),
            "/api/playlists/3/musicas"
        );
        assert_eq!(path_for(Operation::GetSong { song_id: 1500 }), "/api/musicas/1500");
    }
}
