use super::CallError;
use crate::grpc::MusicStreamingClient;
use crate::scenario::Operation;

/// RPC method name for an operation.
pub fn method_for(operation: Operation) -> &'static str {
    match operation {
        Operation::ListSongs => "ListarMusicas",
        Operation::ListUsers => "ListarUsuarios",
        Operation::UserPlaylists { .. } => "ListarPlaylistsPorUsuario",
        Operation::PlaylistSongs { .. } => "ListarMusicasDaPlaylist",
        Operation::GetSong { .. } => "BuscarMusicaPorId",
    }
}

/// Returns the number of items in the response, which is what gRPC records as length.
pub async fn execute(
    client: &mut MusicStreamingClient,
    operation: Operation,
) -> Result<u64, CallError> {
    let items = match operation {
        Operation::ListSongs => client.listar_musicas().await?.musicas.len(),
        Operation::ListUsers => client.listar_usuarios().await?.usuarios.len(),
        Operation::UserPlaylists { user_id } => {
            client
                .listar_playlists_por_usuario(user_id)
                .await?
                .playlists
                .len()
        }
        Operation::PlaylistSongs { playlist_id } => {
            client
                .listar_musicas_da_playlist(playlist_id)
                .await?
                .musicas
                .len()
        }
        Operation::GetSong { song_id } => {
            client.buscar_musica_por_id(song_id).await?;
            1
        }
    };

    Ok(items as u64)
}
