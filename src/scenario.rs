//! Virtual-user behavior: which requests a user issues, how often, and how long it
//! pauses between them.

use anyhow::{bail, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Wire protocol a scenario speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Rest,
    #[value(name = "graphql")]
    GraphQl,
    Soap,
    Grpc,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [
        Protocol::Rest,
        Protocol::GraphQl,
        Protocol::Soap,
        Protocol::Grpc,
    ];

    /// Lower-case label used in result file names.
    pub fn slug(self) -> &'static str {
        match self {
            Protocol::Rest => "rest",
            Protocol::GraphQl => "graphql",
            Protocol::Soap => "soap",
            Protocol::Grpc => "grpc",
        }
    }

    /// Upper-case label used in reports and charts.
    pub fn label(self) -> &'static str {
        match self {
            Protocol::Rest => "REST",
            Protocol::GraphQl => "GRAPHQL",
            Protocol::Soap => "SOAP",
            Protocol::Grpc => "GRPC",
        }
    }

    /// Prefix of the request names this protocol's scenario reports.
    pub fn request_prefix(self) -> &'static str {
        match self {
            Protocol::Rest => "REST",
            Protocol::GraphQl => "GraphQL",
            Protocol::Soap => "SOAP",
            Protocol::Grpc => "gRPC",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// The API operations a virtual user can exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ListSongs,
    ListUsers,
    UserPlaylists,
    PlaylistSongs,
    GetSong,
}

/// An operation with its random parameter already drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListSongs,
    ListUsers,
    UserPlaylists { user_id: i64 },
    PlaylistSongs { playlist_id: i64 },
    GetSong { song_id: i64 },
}

/// How a plain HTTP response is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCheck {
    /// Only `200 OK` counts as success.
    Strict,
    /// Anything below 400 counts as success.
    Lenient,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub kind: OperationKind,
    /// Name under which the request is recorded in the statistics.
    pub name: String,
    pub weight: u32,
}

impl Task {
    fn new(kind: OperationKind, name: impl Into<String>, weight: u32) -> Self {
        Self {
            kind,
            name: name.into(),
            weight,
        }
    }
}

/// Uniform pause between two tasks of the same user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitTime {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl WaitTime {
    pub fn between(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs_f64(self.min_secs.max(0.0));
        }
        Duration::from_secs_f64(rng.gen_range(self.min_secs..=self.max_secs))
    }
}

/// A complete virtual-user definition.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub protocol: Protocol,
    pub tasks: Vec<Task>,
    pub wait: WaitTime,
    pub user_ids: RangeInclusive<i64>,
    pub playlist_ids: RangeInclusive<i64>,
    pub song_ids: RangeInclusive<i64>,
    pub check: ResponseCheck,
    selector: WeightedIndex<u32>,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        protocol: Protocol,
        tasks: Vec<Task>,
        wait: WaitTime,
    ) -> Result<Self> {
        let name = name.into();
        if tasks.is_empty() {
            bail!("Scenario '{}' has no tasks", name);
        }
        if wait.min_secs < 0.0 || wait.min_secs > wait.max_secs {
            bail!(
                "Scenario '{}' has an invalid wait time ({}s..{}s)",
                name,
                wait.min_secs,
                wait.max_secs
            );
        }
        let selector = WeightedIndex::new(tasks.iter().map(|t| t.weight)).map_err(|e| {
            anyhow::anyhow!("Scenario '{}' has invalid task weights: {}", name, e)
        })?;

        Ok(Self {
            name,
            protocol,
            tasks,
            wait,
            user_ids: 1..=50,
            playlist_ids: 1..=100,
            song_ids: 1..=200,
            check: ResponseCheck::Strict,
            selector,
        })
    }

    pub fn with_user_ids(mut self, ids: RangeInclusive<i64>) -> Self {
        self.user_ids = ids;
        self
    }

    pub fn with_playlist_ids(mut self, ids: RangeInclusive<i64>) -> Self {
        self.playlist_ids = ids;
        self
    }

    pub fn with_song_ids(mut self, ids: RangeInclusive<i64>) -> Self {
        self.song_ids = ids;
        self
    }

    pub fn with_check(mut self, check: ResponseCheck) -> Self {
        self.check = check;
        self
    }

    /// The per-protocol comparison scenario: list songs, list users and a random
    /// user's playlists, weighted 3/3/4.
    pub fn for_protocol(protocol: Protocol) -> Self {
        let prefix = protocol.request_prefix();
        let tasks = vec![
            Task::new(
                OperationKind::ListSongs,
                format!("{} - Listar Todas Músicas", prefix),
                3,
            ),
            Task::new(
                OperationKind::ListUsers,
                format!("{} - Listar Todos Usuários", prefix),
                3,
            ),
            Task::new(
                OperationKind::UserPlaylists,
                format!("{} - Listar Playlists de Usuário", prefix),
                4,
            ),
        ];

        Self::new(protocol.slug(), protocol, tasks, WaitTime::between(0.5, 2.0))
            .map(|s| s.with_user_ids(1..=50))
            .unwrap_or_else(|e| unreachable!("built-in scenario is valid: {e}"))
    }

    /// REST browsing behavior that also walks into playlists.
    pub fn browse() -> Self {
        let tasks = vec![
            Task::new(OperationKind::ListSongs, "Listar Músicas", 3),
            Task::new(OperationKind::ListUsers, "Listar Usuários", 3),
            Task::new(OperationKind::UserPlaylists, "Playlists de Usuário", 2),
            Task::new(OperationKind::PlaylistSongs, "Músicas da Playlist", 2),
        ];

        Self::new("browse", Protocol::Rest, tasks, WaitTime::between(1.0, 3.0))
            .map(|s| {
                s.with_user_ids(51..=100)
                    .with_playlist_ids(1..=100)
                    .with_check(ResponseCheck::Lenient)
            })
            .unwrap_or_else(|e| unreachable!("built-in scenario is valid: {e}"))
    }

    /// REST catalog lookups by id, recorded under their URL templates.
    pub fn catalog() -> Self {
        let tasks = vec![
            Task::new(OperationKind::ListSongs, "/api/musicas", 2),
            Task::new(OperationKind::GetSong, "/api/musicas/[id]", 3),
            Task::new(OperationKind::UserPlaylists, "/api/playlists/usuario/[id]", 4),
            Task::new(OperationKind::ListUsers, "/api/usuarios", 6),
        ];

        Self::new("catalog", Protocol::Rest, tasks, WaitTime::between(1.0, 3.0))
            .map(|s| {
                s.with_song_ids(1001..=2000)
                    .with_user_ids(201..=400)
                    .with_check(ResponseCheck::Lenient)
            })
            .unwrap_or_else(|e| unreachable!("built-in scenario is valid: {e}"))
    }

    /// Looks up a built-in scenario by name: a protocol slug, `browse` or `catalog`.
    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "rest" => Ok(Self::for_protocol(Protocol::Rest)),
            "graphql" => Ok(Self::for_protocol(Protocol::GraphQl)),
            "soap" => Ok(Self::for_protocol(Protocol::Soap)),
            "grpc" => Ok(Self::for_protocol(Protocol::Grpc)),
            "browse" => Ok(Self::browse()),
            "catalog" => Ok(Self::catalog()),
            other => bail!(
                "Unknown scenario '{}'. Use: rest, graphql, soap, grpc, browse, catalog",
                other
            ),
        }
    }

    pub fn pick_task<R: Rng + ?Sized>(&self, rng: &mut R) -> &Task {
        &self.tasks[self.selector.sample(rng)]
    }

    /// Draws the random id a parameterized operation needs.
    pub fn materialize<R: Rng + ?Sized>(&self, kind: OperationKind, rng: &mut R) -> Operation {
        match kind {
            OperationKind::ListSongs => Operation::ListSongs,
            OperationKind::ListUsers => Operation::ListUsers,
            OperationKind::UserPlaylists => Operation::UserPlaylists {
                user_id: rng.gen_range(self.user_ids.clone()),
            },
            OperationKind::PlaylistSongs => Operation::PlaylistSongs {
                playlist_id: rng.gen_range(self.playlist_ids.clone()),
            },
            OperationKind::GetSong => Operation::GetSong {
                song_id: rng.gen_range(self.song_ids.clone()),
            },
        }
    }
}
