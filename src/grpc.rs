//! Client for the `MusicStreamingService` gRPC API.
//!
//! The message types are declared by hand with `prost` derives instead of being
//! generated from the `.proto` file, so building the crate does not need `protoc`.
//! Field tags follow the service's schema.

use anyhow::{anyhow, Result};
use http::uri::PathAndQuery;
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};

pub const DEFAULT_SERVICE: &str = "musicstreaming.MusicStreamingService";

pub mod proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Empty {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct UsuarioIdRequest {
        #[prost(int64, tag = "1")]
        pub usuario_id: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PlaylistIdRequest {
        #[prost(int64, tag = "1")]
        pub playlist_id: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct MusicaIdRequest {
        #[prost(int64, tag = "1")]
        pub musica_id: i64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct UsuarioProto {
        #[prost(int64, tag = "1")]
        pub id: i64,
        #[prost(string, tag = "2")]
        pub nome: ::prost::alloc::string::String,
        #[prost(int32, tag = "3")]
        pub idade: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct MusicaProto {
        #[prost(int64, tag = "1")]
        pub id: i64,
        #[prost(string, tag = "2")]
        pub nome: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub artista: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PlaylistProto {
        #[prost(int64, tag = "1")]
        pub id: i64,
        #[prost(string, tag = "2")]
        pub nome: ::prost::alloc::string::String,
        #[prost(int64, tag = "3")]
        pub usuario_id: i64,
        #[prost(string, tag = "4")]
        pub usuario_nome: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PlaylistComMusicasProto {
        #[prost(int64, tag = "1")]
        pub id: i64,
        #[prost(string, tag = "2")]
        pub nome: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "3")]
        pub musicas: ::prost::alloc::vec::Vec<MusicaProto>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListaUsuariosResponse {
        #[prost(message, repeated, tag = "1")]
        pub usuarios: ::prost::alloc::vec::Vec<UsuarioProto>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListaMusicasResponse {
        #[prost(message, repeated, tag = "1")]
        pub musicas: ::prost::alloc::vec::Vec<MusicaProto>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListaPlaylistsResponse {
        #[prost(message, repeated, tag = "1")]
        pub playlists: ::prost::alloc::vec::Vec<PlaylistProto>,
    }
}

/// One connection to the gRPC endpoint. Each virtual user owns its own client.
#[derive(Debug, Clone)]
pub struct MusicStreamingClient {
    inner: tonic::client::Grpc<Channel>,
    service: String,
}

impl MusicStreamingClient {
    /// Creates a lazily connecting client; the first call establishes the channel.
    pub fn new(endpoint: &str, service: &str, timeout: Duration) -> Result<Self> {
        let channel = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| anyhow!("Invalid gRPC endpoint {}: {}", endpoint, e))?
            .timeout(timeout)
            .connect_lazy();

        Ok(Self {
            inner: tonic::client::Grpc::new(channel),
            service: service.to_string(),
        })
    }

    pub fn method_path(&self, method: &str) -> String {
        format!("/{}/{}", self.service, method)
    }

    async fn unary<Req, Resp>(&mut self, method: &str, request: Req) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::new(Code::Unavailable, format!("Service was not ready: {}", e)))?;

        let path = PathAndQuery::try_from(self.method_path(method))
            .map_err(|e| Status::invalid_argument(format!("Invalid method path: {}", e)))?;
        let codec = ProstCodec::<Req, Resp>::default();

        let response = self.inner.unary(Request::new(request), path, codec).await?;
        Ok(response.into_inner())
    }

    pub async fn listar_musicas(&mut self) -> Result<proto::ListaMusicasResponse, Status> {
        self.unary("ListarMusicas", proto::Empty {}).await
    }

    pub async fn listar_usuarios(&mut self) -> Result<proto::ListaUsuariosResponse, Status> {
        self.unary("ListarUsuarios", proto::Empty {}).await
    }

    pub async fn listar_playlists_por_usuario(
        &mut self,
        usuario_id: i64,
    ) -> Result<proto::ListaPlaylistsResponse, Status> {
        self.unary(
            "ListarPlaylistsPorUsuario",
            proto::UsuarioIdRequest { usuario_id },
        )
        .await
    }

    pub async fn listar_musicas_da_playlist(
        &mut self,
        playlist_id: i64,
    ) -> Result<proto::PlaylistComMusicasProto, Status> {
        self.unary(
            "ListarMusicasDaPlaylist",
            proto::PlaylistIdRequest { playlist_id },
        )
        .await
    }

    pub async fn buscar_musica_por_id(
        &mut self,
        musica_id: i64,
    ) -> Result<proto::MusicaProto, Status> {
        self.unary("BuscarMusicaPorId", proto::MusicaIdRequest { musica_id })
            .await
    }
}
