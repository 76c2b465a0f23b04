//! Single binary web server: tournament commands, snapshot export/import and
//! collaborator sync and presence over REST. Static front-end (if any) from /static.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT.
//! Optional env: DATA_DIR (persist snapshots), INACTIVITY_HOURS, SYNC_POLL_SECS, LONG_POLL_SECS.

use actix_files::Files;
use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::{
    cookie::Key,
    get, post, put,
    web::{Data, Json, Path, Query},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use uno_tournament_web::{
    apply_command, summarize_participants, Command, FileSnapshotStore, MatchId, MemorySnapshotStore,
    Participant, Presence, RoundId, Side, Snapshot, SnapshotStore, Tournament, TournamentId,
};
use uuid::Uuid;

/// Per-tournament entry: tournament data, its shared snapshot store, who is
/// looking at it and last activity time.
struct TournamentEntry {
    tournament: Tournament,
    store: Arc<dyn SnapshotStore>,
    /// File polling task, when the store is file-backed.
    poller: Option<JoinHandle<()>>,
    /// Timestamp of the last snapshot written or absorbed.
    synced: Option<DateTime<Utc>>,
    presence: Presence,
    last_activity: Instant,
}

impl TournamentEntry {
    fn new(tournament: Tournament, config: &ServerConfig) -> Self {
        let path = config
            .data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", tournament.id())));
        let file = match path.map(FileSnapshotStore::open) {
            Some(Ok(file)) => Some(file),
            Some(Err(e)) => {
                log::warn!("Falling back to memory store for {}: {}", tournament.id(), e);
                None
            }
            None => None,
        };
        Self::with_file(tournament, file, config)
    }

    /// Entry on an already opened file store, or an in-memory one.
    fn with_file(tournament: Tournament, file: Option<FileSnapshotStore>, config: &ServerConfig) -> Self {
        let file = file.map(Arc::new);
        let poller = file
            .as_ref()
            .map(|f| Arc::clone(f).spawn_polling(config.sync_poll));
        let store: Arc<dyn SnapshotStore> = match file {
            Some(file) => file,
            None => Arc::new(MemorySnapshotStore::new()),
        };
        let synced = store.read().ok().flatten().map(|s| s.timestamp);
        Self {
            tournament,
            store,
            poller,
            synced,
            presence: Presence::new(),
            last_activity: Instant::now(),
        }
    }

    /// Mark the entry as used by `user` and take over any newer snapshot
    /// another process wrote to the store.
    fn touch(&mut self, user: &str) {
        self.last_activity = Instant::now();
        self.presence.see(user, Utc::now());
        let snapshot = match self.store.read() {
            Ok(Some(s)) if s.is_newer_than(self.synced) => s,
            Ok(_) => return,
            Err(e) => {
                log::warn!("Could not read store of {}: {}", self.tournament.id(), e);
                return;
            }
        };
        let stamp = snapshot.timestamp;
        let author = snapshot.modified_by.clone().unwrap_or_default();
        match self.tournament.restore(snapshot) {
            Ok(()) => log::info!("Tournament {} updated by {}", self.tournament.id(), author),
            Err(e) => log::warn!("Ignoring stored snapshot of {}: {}", self.tournament.id(), e),
        }
        self.synced = Some(stamp);
    }

    /// Write the current state to the store, stamped with the acting user.
    fn publish(&mut self, user: &str, action: String) {
        let mut snapshot = self.tournament.to_snapshot();
        snapshot.modified_by = Some(user.to_string());
        snapshot.action = Some(action);
        let stamp = snapshot.timestamp;
        match self.store.write(snapshot) {
            Ok(()) => self.synced = Some(stamp),
            Err(e) => log::warn!("Could not save tournament {}: {}", self.tournament.id(), e),
        }
    }
}

impl Drop for TournamentEntry {
    fn drop(&mut self) {
        if let Some(poller) = &self.poller {
            poller.abort();
        }
    }
}

/// In-memory state: many tournaments by ID. Entries are removed after inactivity.
type AppState = Data<RwLock<HashMap<TournamentId, TournamentEntry>>>;

/// Settings read from the environment at startup.
#[derive(Clone, Debug)]
struct ServerConfig {
    host: String,
    port: u16,
    data_dir: Option<PathBuf>,
    inactivity_timeout: Duration,
    sync_poll: Duration,
    long_poll: Duration,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
            port: env_parse("PORT").unwrap_or_else(default_port),
            data_dir: std::env::var("DATA_DIR")
                .ok()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .map(PathBuf::from),
            inactivity_timeout: Duration::from_secs(env_parse("INACTIVITY_HOURS").unwrap_or(12) * 3600),
            sync_poll: Duration::from_secs(env_parse("SYNC_POLL_SECS").unwrap_or(2).max(1)),
            long_poll: Duration::from_secs(env_parse("LONG_POLL_SECS").unwrap_or(25)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

const SESSION_USER_KEY: &str = "user_name";

/// Collaborator name from the session; a guest name is assigned on first use.
fn session_user(session: &Session) -> String {
    if let Ok(Some(name)) = session.get::<String>(SESSION_USER_KEY) {
        return name;
    }
    let name = format!("guest-{}", &Uuid::new_v4().simple().to_string()[..8]);
    if let Err(e) = session.insert(SESSION_USER_KEY, &name) {
        log::warn!("Could not store session user: {}", e);
    }
    name
}

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct UserBody {
    name: String,
}

#[derive(Deserialize)]
struct ParticipantsBody {
    participants: String,
}

#[derive(Deserialize)]
struct StageEliminationBody {
    round_id: RoundId,
    player: Participant,
}

#[derive(Deserialize)]
struct RoundBody {
    round_id: RoundId,
}

#[derive(Deserialize)]
struct StageMatchBody {
    match_id: MatchId,
    slot: Side,
}

#[derive(Deserialize)]
struct MatchBody {
    match_id: MatchId,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// `since`: RFC 3339 timestamp of the last snapshot the caller has seen.
#[derive(Deserialize)]
struct SyncQuery {
    since: Option<DateTime<Utc>>,
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "No tournament" }))
}

fn lock_error() -> HttpResponse {
    HttpResponse::InternalServerError().body("lock error")
}

/// Apply one command to a tournament and publish the result to its store.
fn run_command(state: &AppState, id: TournamentId, session: &Session, command: Command) -> HttpResponse {
    let user = session_user(session);
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let entry = match g.get_mut(&id) {
        Some(e) => e,
        None => return not_found(),
    };
    entry.touch(&user);
    match apply_command(&mut entry.tournament, &command) {
        Ok(()) => {
            let action = command.describe(&entry.tournament);
            log::debug!("{} on {}: {}", user, id, action);
            entry.publish(&user, action);
            HttpResponse::Ok().json(&entry.tournament)
        }
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() })),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "uno-tournament-web",
    })
}

/// Avoid 404 in browser tab: favicon not required for app logic.
#[get("/favicon.ico")]
async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// Set the collaborator name used to stamp this browser's changes.
#[post("/api/session/user")]
async fn api_set_user(session: Session, body: Json<UserBody>) -> HttpResponse {
    let name = body.name.trim();
    if name.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({ "error": "Please enter your name" }));
    }
    match session.insert(SESSION_USER_KEY, name) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "name": name })),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// Live participant counter: count, teams of four and substitutes.
#[post("/api/participants/preview")]
async fn api_preview_participants(body: Json<ParticipantsBody>) -> HttpResponse {
    HttpResponse::Ok().json(summarize_participants(&body.participants))
}

/// Create a new empty tournament (returns it with id; client stores id for subsequent requests).
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, config: Data<ServerConfig>) -> HttpResponse {
    let tournament = Tournament::new();
    let id = tournament.id();
    let entry = TournamentEntry::new(tournament, &config);
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let response = HttpResponse::Ok().json(&entry.tournament);
    g.insert(id, entry);
    response
}

/// Get a tournament by id (404 if not found). Touching it refreshes last_activity.
#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>, session: Session) -> HttpResponse {
    let user = session_user(&session);
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.get_mut(&path.id) {
        Some(entry) => {
            entry.touch(&user);
            HttpResponse::Ok().json(&entry.tournament)
        }
        None => not_found(),
    }
}

/// Draw teams from raw participant text (tournament must be empty).
#[post("/api/tournaments/{id}/generate")]
async fn api_generate(
    state: AppState,
    path: Path<TournamentPath>,
    session: Session,
    body: Json<ParticipantsBody>,
) -> HttpResponse {
    let command = Command::Generate {
        participants: body.into_inner().participants,
    };
    run_command(&state, path.id, &session, command)
}

/// Select the player to eliminate in a team round.
#[put("/api/tournaments/{id}/eliminations/stage")]
async fn api_stage_elimination(
    state: AppState,
    path: Path<TournamentPath>,
    session: Session,
    body: Json<StageEliminationBody>,
) -> HttpResponse {
    let body = body.into_inner();
    let command = Command::StageElimination {
        round_id: body.round_id,
        player: body.player,
    };
    run_command(&state, path.id, &session, command)
}

/// Confirm the staged elimination of a team round.
#[post("/api/tournaments/{id}/eliminations/commit")]
async fn api_commit_elimination(
    state: AppState,
    path: Path<TournamentPath>,
    session: Session,
    body: Json<RoundBody>,
) -> HttpResponse {
    let command = Command::CommitElimination {
        round_id: body.into_inner().round_id,
    };
    run_command(&state, path.id, &session, command)
}

/// Select the winner of a winners-bracket match.
#[put("/api/tournaments/{id}/matches/stage")]
async fn api_stage_match(
    state: AppState,
    path: Path<TournamentPath>,
    session: Session,
    body: Json<StageMatchBody>,
) -> HttpResponse {
    let body = body.into_inner();
    let command = Command::StageMatchWinner {
        match_id: body.match_id,
        slot: body.slot,
    };
    run_command(&state, path.id, &session, command)
}

/// Confirm a winners-bracket match and promote its winner.
#[post("/api/tournaments/{id}/matches/commit")]
async fn api_commit_match(
    state: AppState,
    path: Path<TournamentPath>,
    session: Session,
    body: Json<MatchBody>,
) -> HttpResponse {
    let command = Command::CommitMatch {
        match_id: body.into_inner().match_id,
    };
    run_command(&state, path.id, &session, command)
}

/// Restart: same teams, all bracket progress discarded.
#[post("/api/tournaments/{id}/reset")]
async fn api_reset(state: AppState, path: Path<TournamentPath>, session: Session) -> HttpResponse {
    run_command(&state, path.id, &session, Command::Reset)
}

/// Back to an empty tournament.
#[post("/api/tournaments/{id}/clear")]
async fn api_clear(state: AppState, path: Path<TournamentPath>, session: Session) -> HttpResponse {
    run_command(&state, path.id, &session, Command::Clear)
}

/// Any command as `{"command": "...", ...}`.
#[post("/api/tournaments/{id}/commands")]
async fn api_command(
    state: AppState,
    path: Path<TournamentPath>,
    session: Session,
    body: Json<Command>,
) -> HttpResponse {
    run_command(&state, path.id, &session, body.into_inner())
}

/// Download the tournament snapshot as a JSON file.
#[get("/api/tournaments/{id}/export")]
async fn api_export(state: AppState, path: Path<TournamentPath>, session: Session) -> HttpResponse {
    let user = session_user(&session);
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let entry = match g.get_mut(&path.id) {
        Some(e) => e,
        None => return not_found(),
    };
    entry.touch(&user);
    let mut snapshot = entry.tournament.to_snapshot();
    snapshot.modified_by = Some(user);
    match snapshot.to_json_pretty() {
        Ok(body) => HttpResponse::Ok()
            .content_type("application/json")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", snapshot.export_file_name()),
            ))
            .body(body),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// Replace the tournament with an uploaded snapshot (validated first).
#[post("/api/tournaments/{id}/import")]
async fn api_import(
    state: AppState,
    path: Path<TournamentPath>,
    session: Session,
    body: String,
) -> HttpResponse {
    let user = session_user(&session);
    let snapshot = match Snapshot::from_json(&body) {
        Ok(s) => s,
        Err(e) => return HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() })),
    };
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let entry = match g.get_mut(&path.id) {
        Some(e) => e,
        None => return not_found(),
    };
    entry.touch(&user);
    match entry.tournament.restore(snapshot) {
        Ok(()) => {
            log::info!("{} imported a snapshot into {}", user, path.id);
            entry.publish(&user, "Tournament imported".to_string());
            HttpResponse::Ok().json(&entry.tournament)
        }
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// Newest snapshot written by someone else since `since`, or 204.
#[get("/api/tournaments/{id}/sync")]
async fn api_sync(
    state: AppState,
    path: Path<TournamentPath>,
    session: Session,
    query: Query<SyncQuery>,
) -> HttpResponse {
    let user = session_user(&session);
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let entry = match g.get_mut(&path.id) {
        Some(e) => e,
        None => return not_found(),
    };
    entry.touch(&user);
    match entry.store.read() {
        Ok(Some(snapshot)) if snapshot.is_newer_than(query.since) && snapshot.is_external_to(&user) => {
            HttpResponse::Ok().json(snapshot)
        }
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// Like `sync`, but waits up to LONG_POLL_SECS for such a snapshot to appear.
#[get("/api/tournaments/{id}/watch")]
async fn api_watch(
    state: AppState,
    config: Data<ServerConfig>,
    path: Path<TournamentPath>,
    session: Session,
    query: Query<SyncQuery>,
) -> HttpResponse {
    let user = session_user(&session);
    let since = query.since;
    let mut rx = {
        let mut g = match state.write() {
            Ok(guard) => guard,
            Err(_) => return lock_error(),
        };
        match g.get_mut(&path.id) {
            Some(entry) => {
                entry.touch(&user);
                entry.store.subscribe()
            }
            None => return not_found(),
        }
    };

    let wanted = |s: &Option<Snapshot>| {
        s.as_ref()
            .is_some_and(|s| s.is_newer_than(since) && s.is_external_to(&user))
    };
    let snapshot = match tokio::time::timeout(config.long_poll, rx.wait_for(wanted)).await {
        Ok(Ok(seen)) => (*seen).clone(),
        _ => None,
    };
    match snapshot {
        Some(s) => HttpResponse::Ok().json(s),
        None => HttpResponse::NoContent().finish(),
    }
}

/// Collaborators seen on this tournament in the last few minutes.
#[get("/api/tournaments/{id}/users")]
async fn api_active_users(state: AppState, path: Path<TournamentPath>, session: Session) -> HttpResponse {
    let user = session_user(&session);
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let entry = match g.get_mut(&path.id) {
        Some(e) => e,
        None => return not_found(),
    };
    entry.touch(&user);
    HttpResponse::Ok().json(serde_json::json!({
        "you": user,
        "users": entry.presence.active(Utc::now()),
    }))
}

/// Reload persisted tournaments from DATA_DIR.
fn load_saved(config: &ServerConfig) -> HashMap<TournamentId, TournamentEntry> {
    let mut loaded = HashMap::new();
    let Some(dir) = &config.data_dir else {
        return loaded;
    };
    if let Err(e) = std::fs::create_dir_all(dir) {
        log::warn!("Cannot create data dir {}: {}", dir.display(), e);
        return loaded;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot read data dir {}: {}", dir.display(), e);
            return loaded;
        }
    };
    for path in entries.flatten().map(|e| e.path()) {
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let restored = FileSnapshotStore::open(&path).and_then(|store| match store.read()? {
            Some(snapshot) => Tournament::from_snapshot(snapshot).map(|t| Some((t, store))),
            None => Ok(None),
        });
        match restored {
            Ok(Some((tournament, store))) => {
                log::info!("Restored tournament {} ({:?})", tournament.id(), tournament.state());
                loaded.insert(tournament.id(), TournamentEntry::with_file(tournament, Some(store), config));
            }
            Ok(None) => {}
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    loaded
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env();
    log::info!("Starting server at http://{}:{}", config.host, config.port);
    if let Some(dir) = &config.data_dir {
        log::info!("Persisting tournaments in {}", dir.display());
    }

    let state = Data::new(RwLock::new(load_saved(&config)));

    // Background task: every 30 minutes, remove inactive tournaments
    let state_cleanup = state.clone();
    let inactivity_timeout = config.inactivity_timeout;
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(Duration::from_secs(30 * 60));
        loop {
            interval.tick().await;
            let mut g = match state_cleanup.write() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            let before = g.len();
            g.retain(|_, entry| entry.last_activity.elapsed() < inactivity_timeout);
            let removed = before - g.len();
            if removed > 0 {
                log::info!("Cleaned up {} inactive tournament(s)", removed);
            }
        }
    });

    let session_key = Key::generate();
    let bind = (config.host.clone(), config.port);
    let config = Data::new(config);
    HttpServer::new(move || {
        App::new()
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .app_data(state.clone())
            .app_data(config.clone())
            .service(api_health)
            .service(favicon)
            .service(api_set_user)
            .service(api_preview_participants)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_generate)
            .service(api_stage_elimination)
            .service(api_commit_elimination)
            .service(api_stage_match)
            .service(api_commit_match)
            .service(api_reset)
            .service(api_clear)
            .service(api_command)
            .service(api_export)
            .service(api_import)
            .service(api_sync)
            .service(api_watch)
            .service(api_active_users)
            .service(Files::new("/static", "static"))
    })
    .bind(bind)?
    .run()
    .await
}
