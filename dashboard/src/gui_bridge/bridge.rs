use crate::gui_bridge::model::DashboardView;
use crate::workflow::runner::{lock_session, AnalysisDriver, SharedSession};
use log::{info, warn};
use serde_json::json;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::runtime::Builder;
use varcore::session::SessionStore;
use varcore::telemetry::MetricsRecorder;
use varcore::{AnalysisSession, VarError};
use warp::http::{header, Response, StatusCode};
use warp::hyper::body::Bytes;
use warp::reply::Reply;
use warp::{Filter, Rejection};

const MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;

type HttpReply = warp::reply::Response;

/// Handles shared by every route.
#[derive(Clone)]
pub struct BridgeState {
    session: SharedSession,
    store: Arc<SessionStore>,
    metrics: Arc<MetricsRecorder>,
    driver: AnalysisDriver,
    run_epoch: Arc<AtomicU64>,
}

impl BridgeState {
    pub fn new(session: AnalysisSession, tick_interval: Duration) -> Self {
        let store = session.store();
        let metrics = session.metrics();
        Self {
            session: Arc::new(Mutex::new(session)),
            store,
            metrics,
            driver: AnalysisDriver::new(tick_interval),
            run_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn view(&self) -> DashboardView {
        let snapshot = self.store.snapshot();
        DashboardView {
            version: snapshot.version,
            video_info: snapshot.video_info,
            incidents: snapshot.incidents.clone(),
            results: snapshot.results,
            progress: lock_session(&self.session).progress(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Retires every spawned driver. Takes the locked session so the bump is
    /// ordered with the state change that caused it.
    fn invalidate_runs(&self, _locked: &AnalysisSession) -> u64 {
        self.run_epoch.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn status_for(err: &VarError) -> StatusCode {
    match err {
        VarError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        VarError::UnreadableVideo(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VarError::InvalidState(_) => StatusCode::CONFLICT,
        VarError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        VarError::Io(_) | VarError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_reply(err: &VarError) -> HttpReply {
    warp::reply::with_status(
        warp::reply::json(&json!({ "error": err.to_string() })),
        status_for(err),
    )
    .into_response()
}

fn with_state(
    state: BridgeState,
) -> impl Filter<Extract = (BridgeState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

async fn get_view(state: BridgeState) -> Result<HttpReply, Infallible> {
    Ok(warp::reply::json(&state.view()).into_response())
}

async fn get_video(state: BridgeState) -> Result<HttpReply, Infallible> {
    Ok(warp::reply::json(&state.store.video_info()).into_response())
}

async fn get_video_file(state: BridgeState) -> Result<HttpReply, Infallible> {
    let artifact = {
        let session = lock_session(&state.session);
        session
            .video_artifact()
            .map(|artifact| (artifact.path().to_path_buf(), artifact.format().mime_type()))
    };
    let Some((path, mime_type)) = artifact else {
        return Ok(error_reply(&VarError::InvalidState("no video uploaded".into())));
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(Response::builder()
            .header(header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .into_response()),
        Err(err) => Ok(error_reply(&VarError::Io(err))),
    }
}

async fn get_incidents(state: BridgeState) -> Result<HttpReply, Infallible> {
    Ok(warp::reply::json(&state.store.snapshot().incidents).into_response())
}

async fn get_results(state: BridgeState) -> Result<HttpReply, Infallible> {
    Ok(warp::reply::json(&state.store.results()).into_response())
}

async fn get_progress(state: BridgeState) -> Result<HttpReply, Infallible> {
    let progress = lock_session(&state.session).progress();
    Ok(warp::reply::json(&progress).into_response())
}

async fn get_metrics(state: BridgeState) -> Result<HttpReply, Infallible> {
    Ok(warp::reply::json(&state.metrics.snapshot()).into_response())
}

async fn post_upload(
    filename: String,
    body: Bytes,
    state: BridgeState,
) -> Result<HttpReply, Infallible> {
    let size = body.len();
    let worker = state.clone();
    let name = filename.clone();
    // Persisting the clip is blocking file I/O under the session lock.
    let uploaded = tokio::task::spawn_blocking(move || {
        let mut session = lock_session(&worker.session);
        let info = session.upload(&name, &body)?;
        worker.invalidate_runs(&session);
        Ok::<_, VarError>(info)
    })
    .await
    .unwrap_or_else(|err| Err(VarError::Io(io::Error::new(io::ErrorKind::Other, err))));
    match uploaded {
        Ok(info) => {
            info!("[bridge] accepted {} ({} bytes)", filename, size);
            Ok(warp::reply::json(&info).into_response())
        }
        Err(err) => {
            warn!("[bridge] upload {} rejected: {}", filename, err);
            Ok(error_reply(&err))
        }
    }
}

async fn post_analyze(state: BridgeState) -> Result<HttpReply, Infallible> {
    let started = {
        let mut session = lock_session(&state.session);
        session
            .run_analysis()
            .map(|progress| (progress, state.invalidate_runs(&session)))
    };
    match started {
        Ok((progress, run_epoch)) => {
            let driver = state.driver;
            let session = state.session.clone();
            let epoch = state.run_epoch.clone();
            tokio::spawn(async move {
                if let Some(done) = driver.drive(session, epoch, run_epoch).await {
                    info!("[bridge] analysis finished at tick {}", done.tick);
                }
            });
            Ok(
                warp::reply::with_status(warp::reply::json(&progress), StatusCode::ACCEPTED)
                    .into_response(),
            )
        }
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn post_cancel(state: BridgeState) -> Result<HttpReply, Infallible> {
    let cancelled = {
        let mut session = lock_session(&state.session);
        let cancelled = session.cancel();
        if cancelled {
            state.invalidate_runs(&session);
        }
        cancelled
    };
    Ok(warp::reply::json(&json!({ "cancelled": cancelled })).into_response())
}

async fn get_export(state: BridgeState) -> Result<HttpReply, Infallible> {
    let exported = lock_session(&state.session).export();
    match exported {
        Ok(document) => Ok(Response::builder()
            .header(header::CONTENT_TYPE, document.mime_type)
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            )
            .body(document.body)
            .into_response()),
        Err(err) => Ok(error_reply(&err)),
    }
}

/// Routes of the presentation boundary.
pub fn routes(
    state: BridgeState,
) -> impl Filter<Extract = (HttpReply,), Error = Rejection> + Clone {
    let view = warp::path!("session")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_view);
    let video = warp::path!("video")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_video);
    let video_file = warp::path!("video" / "file")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_video_file);
    let incidents = warp::path!("incidents")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_incidents);
    let results = warp::path!("results")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_results);
    let progress = warp::path!("progress")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_progress);
    let metrics = warp::path!("metrics")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_metrics);
    let upload = warp::path!("upload" / String)
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_UPLOAD_BYTES))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(post_upload);
    let analyze = warp::path!("analyze")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(post_analyze);
    let cancel = warp::path!("cancel")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(post_cancel);
    let export = warp::path!("export")
        .and(warp::get())
        .and(with_state(state))
        .and_then(get_export);

    view.or(video)
        .unify()
        .or(video_file)
        .unify()
        .or(incidents)
        .unify()
        .or(results)
        .unify()
        .or(progress)
        .unify()
        .or(metrics)
        .unify()
        .or(upload)
        .unify()
        .or(analyze)
        .unify()
        .or(cancel)
        .unify()
        .or(export)
        .unify()
}

/// Hosts the presentation endpoints for a single session.
pub struct PresentationBridge {
    state: BridgeState,
}

impl PresentationBridge {
    pub fn new(session: AnalysisSession, tick_interval: Duration) -> Self {
        Self {
            state: BridgeState::new(session, tick_interval),
        }
    }

    /// Serves on a background thread with its own runtime.
    pub fn spawn(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let routes = routes(self.state.clone());
        let runtime = Builder::new_multi_thread().enable_all().build()?;
        thread::spawn(move || {
            runtime.block_on(async move {
                warp::serve(routes).run(addr).await;
            });
        });
        info!("[bridge] listening on http://{}", addr);
        Ok(())
    }

    #[cfg(test)]
    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    /// Cancels any run and removes the session's uploaded clip.
    pub fn shutdown(&self) -> anyhow::Result<()> {
        let mut session = lock_session(&self.state.session);
        self.state.invalidate_runs(&session);
        session.reset()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::build_clip;
    use varcore::pipeline::{RunPhase, RunProgress};
    use varcore::report;
    use varcore::PipelineConfig;

    fn bridge_state() -> BridgeState {
        let session = AnalysisSession::new(PipelineConfig {
            stages: vec!["Initializing".into(), "Analyzing".into()],
            ticks_per_stage: 2,
        })
        .unwrap();
        BridgeState::new(session, Duration::ZERO)
    }

    async fn upload_demo(state: &BridgeState) -> u16 {
        warp::test::request()
            .method("POST")
            .path("/upload/demo.avi")
            .body(build_clip(1500, 25).unwrap())
            .reply(&routes(state.clone()))
            .await
            .status()
            .as_u16()
    }

    async fn wait_for_completion(state: &BridgeState) -> RunProgress {
        for _ in 0..200 {
            let response = warp::test::request()
                .path("/progress")
                .reply(&routes(state.clone()))
                .await;
            let progress: RunProgress = serde_json::from_slice(response.body()).unwrap();
            if progress.phase == RunPhase::Complete {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("analysis never completed");
    }

    #[tokio::test]
    async fn upload_analyze_export_round_trip() {
        let state = bridge_state();
        assert_eq!(upload_demo(&state).await, 200);

        let analyze = warp::test::request()
            .method("POST")
            .path("/analyze")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(analyze.status(), StatusCode::ACCEPTED);

        let done = wait_for_completion(&state).await;
        assert_eq!(done.percent, 100.0);

        let export = warp::test::request()
            .path("/export")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(
            export.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let disposition = export.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("var_report_"));
        let parsed = report::parse(std::str::from_utf8(export.body()).unwrap()).unwrap();
        assert_eq!(parsed.incidents.len(), 3);
        assert_eq!(state.view().results.unwrap().processed_frame_count, 1500);
    }

    async fn post(state: &BridgeState, path: &str) -> StatusCode {
        warp::test::request()
            .method("POST")
            .path(path)
            .reply(&routes(state.clone()))
            .await
            .status()
    }

    #[tokio::test]
    async fn restarted_run_is_driven_to_completion() {
        let state = bridge_state();
        assert_eq!(upload_demo(&state).await, 200);

        for _ in 0..5 {
            assert_eq!(post(&state, "/analyze").await, StatusCode::ACCEPTED);
            assert_eq!(post(&state, "/cancel").await, StatusCode::OK);
        }
        assert_eq!(post(&state, "/analyze").await, StatusCode::ACCEPTED);
        assert_eq!(upload_demo(&state).await, 200);
        assert_eq!(post(&state, "/analyze").await, StatusCode::ACCEPTED);

        let done = wait_for_completion(&state).await;
        assert_eq!(done.tick, done.total_ticks);
        assert_eq!(state.view().incidents.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn upload_runs_off_the_async_workers() {
        let state = bridge_state();
        let (upload, view) = tokio::join!(upload_demo(&state), async {
            warp::test::request()
                .path("/session")
                .reply(&routes(state.clone()))
                .await
                .status()
        });
        assert_eq!(upload, 200);
        assert_eq!(view, StatusCode::OK);
        assert_eq!(state.view().video_info.unwrap().frame_count, 1500);
        assert_eq!(state.view().metrics.uploads_accepted, 1);
    }

    #[tokio::test]
    async fn analyze_without_video_conflicts() {
        let state = bridge_state();
        let response = warp::test::request()
            .method("POST")
            .path("/analyze")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(state.view().incidents.is_empty());
    }

    #[tokio::test]
    async fn upload_errors_map_to_statuses() {
        let state = bridge_state();
        let unsupported = warp::test::request()
            .method("POST")
            .path("/upload/demo.mkv")
            .body("whatever")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let unreadable = warp::test::request()
            .method("POST")
            .path("/upload/demo.mp4")
            .body("definitely not an mp4")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(unreadable.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.view().metrics.uploads_rejected, 2);
        assert!(state.view().video_info.is_none());
    }

    #[tokio::test]
    async fn video_file_serves_uploaded_bytes() {
        let state = bridge_state();
        let missing = warp::test::request()
            .path("/video/file")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(missing.status(), StatusCode::CONFLICT);

        upload_demo(&state).await;
        let served = warp::test::request()
            .path("/video/file")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(served.status(), StatusCode::OK);
        assert_eq!(served.headers()[header::CONTENT_TYPE], "video/x-msvideo");
        assert_eq!(served.body().as_ref(), build_clip(1500, 25).unwrap().as_slice());
    }

    #[tokio::test]
    async fn export_on_empty_session_is_well_formed() {
        let state = bridge_state();
        let export = warp::test::request()
            .path("/export")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(export.status(), StatusCode::OK);
        let parsed = report::parse(std::str::from_utf8(export.body()).unwrap()).unwrap();
        assert!(parsed.incidents.is_empty());
    }

    #[test]
    fn shutdown_clears_session() {
        let mut session = AnalysisSession::new(PipelineConfig::default()).unwrap();
        session
            .upload("demo.avi", &build_clip(300, 25).unwrap())
            .unwrap();
        let bridge = PresentationBridge::new(session, Duration::ZERO);
        assert!(bridge.state().view().video_info.is_some());

        bridge.shutdown().unwrap();
        assert!(bridge.state().view().video_info.is_none());
    }
}
