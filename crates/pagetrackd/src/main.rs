use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use pageproto::chat::{self, Classification};
use pageproto::feed::{self, ChatScope, FeedEvent, ServerSnapshot};
use pageproto::roster::AdminRoster;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

mod queue;
mod recorder;
mod settings;

use queue::{PageQueue, PageRequest};
use settings::{SettingKey, Settings};

/// Chat channel limit; everything said is segmented to fit it.
const SAY_MAX_CHARS: usize = 128;
/// Yell hard cap. Longer text is reported and sent anyway, segmented.
const YELL_MAX_CHARS: usize = 256;
const YELL_DEFAULT_SECS: u32 = 10;

const FEED_BACKOFF_BASE: Duration = Duration::from_secs(1);
const FEED_BACKOFF_MAX: Duration = Duration::from_secs(30);

fn backoff_delay(failures: u32) -> Duration {
    // 1s, 2s, 4s, ... capped.
    let pow = failures.saturating_sub(1).min(16);
    let mult: u32 = 1u32.checked_shl(pow).unwrap_or(u32::MAX);
    FEED_BACKOFF_BASE
        .checked_mul(mult)
        .unwrap_or(FEED_BACKOFF_MAX)
        .min(FEED_BACKOFF_MAX)
}

fn usage_and_exit() -> ! {
    eprintln!(
        "pagetrackd\n\n\
ENV:\n\
  PAGETRACK_FEED_ADDR             game chat feed address (default 127.0.0.1:4080)\n\
  PAGETRACK_CTL_BIND              control listener (default 127.0.0.1:4081)\n\
  PAGETRACK_DEBUG                 per-message diagnostics (default false)\n\
  PAGETRACK_REQUESTS_FOLDER_PATH  request log folder template\n\
  PAGETRACK_REQUESTS_FILE_NAME    request log file template\n\
  PAGETRACK_RESPONSES_FOLDER_PATH response log folder template\n\
  PAGETRACK_RESPONSES_FILE_NAME   response log file template\n\
      templates: {{0}} = month name, {{1}} = month number, {{2}} = year\n\
  PAGETRACK_FAIL_TIME_MINUTES     age at which a pending page fails (default 30)\n\
  PAGETRACK_ADMINS                comma-separated initial roster\n"
    );
    std::process::exit(2);
}

struct Config {
    feed_addr: SocketAddr,
    ctl_bind: SocketAddr,
    settings: Settings,
    admins: Vec<String>,
}

fn parse_args() -> Config {
    if std::env::args().skip(1).any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    let feed_addr: SocketAddr = std::env::var("PAGETRACK_FEED_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:4080".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());
    let ctl_bind: SocketAddr = std::env::var("PAGETRACK_CTL_BIND")
        .unwrap_or_else(|_| "127.0.0.1:4081".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let mut settings = Settings::default();
    for (key, var) in [
        (SettingKey::Debug, "PAGETRACK_DEBUG"),
        (SettingKey::RequestsFolderPath, "PAGETRACK_REQUESTS_FOLDER_PATH"),
        (SettingKey::RequestsFileName, "PAGETRACK_REQUESTS_FILE_NAME"),
        (SettingKey::ResponsesFolderPath, "PAGETRACK_RESPONSES_FOLDER_PATH"),
        (SettingKey::ResponsesFileName, "PAGETRACK_RESPONSES_FILE_NAME"),
        (SettingKey::FailTimeMinutes, "PAGETRACK_FAIL_TIME_MINUTES"),
    ] {
        if let Ok(v) = std::env::var(var) {
            if let Err(e) = settings.apply(key, &v) {
                eprintln!("{var}: {e}");
                usage_and_exit();
            }
        }
    }

    let admins = std::env::var("PAGETRACK_ADMINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Config {
        feed_addr,
        ctl_bind,
        settings,
        admins,
    }
}

#[derive(Clone)]
struct State {
    settings: Arc<tokio::sync::Mutex<Settings>>,
    roster: Arc<tokio::sync::Mutex<AdminRoster>>,
    queue: Arc<tokio::sync::Mutex<PageQueue>>,
    snapshot: Arc<tokio::sync::Mutex<Option<ServerSnapshot>>>,
    out_tx: mpsc::Sender<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pagetrackd=debug".into()),
        )
        .with_target(false)
        .init();

    let cfg = parse_args();

    let mut roster = AdminRoster::new();
    roster.set_all(cfg.admins.clone());

    let (out_tx, out_rx) = mpsc::channel::<String>(256);

    let state = State {
        settings: Arc::new(tokio::sync::Mutex::new(cfg.settings.clone())),
        roster: Arc::new(tokio::sync::Mutex::new(roster)),
        queue: Arc::new(tokio::sync::Mutex::new(PageQueue::new())),
        snapshot: Arc::new(tokio::sync::Mutex::new(None)),
        out_tx,
    };

    {
        let state = state.clone();
        let ctl_bind = cfg.ctl_bind;
        tokio::spawn(async move {
            if let Err(e) = ctl_server_task(ctl_bind, state).await {
                error!(err = %e, "control server exited");
            }
        });
    }

    info!(
        feed_addr = %cfg.feed_addr,
        ctl_bind = %cfg.ctl_bind,
        admins = cfg.admins.len(),
        "pagetrackd starting"
    );

    feed_task(cfg.feed_addr, state, out_rx).await;
    Ok(())
}

/// Connect to the chat feed and stay connected, with bounded backoff.
///
/// Inbound records are classified and drive the queue; outbound say/yell
/// commands arrive over `out_rx` and are written on the same connection.
async fn feed_task(feed_addr: SocketAddr, state: State, mut out_rx: mpsc::Receiver<String>) {
    let mut failures = 0u32;
    let mut announced_down = false;

    loop {
        match TcpStream::connect(feed_addr).await {
            Ok(stream) => {
                failures = 0;
                announced_down = false;
                info!(feed_addr = %feed_addr, "connected to chat feed");

                let (rd, mut wr) = stream.into_split();
                let mut rd = BufReader::new(rd);
                let mut buf = Vec::new();

                loop {
                    tokio::select! {
                        res = rd.read_until(b'\n', &mut buf) => {
                            match res {
                                Ok(0) => {
                                    warn!("chat feed closed");
                                    break;
                                }
                                Ok(_) => {
                                    let line = String::from_utf8_lossy(&buf).into_owned();
                                    buf.clear();
                                    let line = line.trim_end_matches(['\r', '\n']);
                                    if line.is_empty() {
                                        continue;
                                    }
                                    match feed::parse_event(line) {
                                        Ok(ev) => handle_event(&state, ev).await,
                                        Err(e) => warn!(err = %e, "bad feed line"),
                                    }
                                }
                                Err(e) => {
                                    warn!(err = %e, "chat feed read failed");
                                    break;
                                }
                            }
                        }
                        cmd = out_rx.recv() => {
                            let Some(cmd) = cmd else { return };
                            let write = async {
                                wr.write_all(cmd.as_bytes()).await?;
                                wr.write_all(b"\n").await
                            };
                            if let Err(e) = write.await {
                                warn!(err = %e, "chat feed write failed");
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                if !announced_down {
                    warn!(feed_addr = %feed_addr, err = %e, "chat feed unreachable; retrying");
                    announced_down = true;
                }
            }
        }

        failures = failures.saturating_add(1);
        tokio::time::sleep(backoff_delay(failures)).await;
    }
}

async fn handle_event(state: &State, ev: FeedEvent) {
    match ev {
        FeedEvent::ServerInfo(snap) => {
            *state.snapshot.lock().await = Some(snap);
        }
        // Server broadcasts and every chat scope funnel into one path.
        FeedEvent::ServerMessage { message } => {
            handle_chat(state, "SERVER MESSAGE", &message).await;
        }
        FeedEvent::Chat {
            speaker, message, ..
        } => {
            handle_chat(state, &speaker, &message).await;
        }
    }
}

async fn handle_chat(state: &State, speaker: &str, message: &str) {
    let s = state.settings.lock().await.clone();

    if s.debug {
        debug!(speaker = %speaker, message = %message, "chat");
    }

    let classification = {
        let roster = state.roster.lock().await;
        let queue_nonempty = !state.queue.lock().await.is_empty();
        chat::classify(speaker, message, &roster, queue_nonempty)
    };

    let now = Utc::now();
    match classification {
        Classification::Ignore => {}
        Classification::Request { requester, text } => {
            if s.requests_folder_path.is_empty() || s.requests_file_name.is_empty() {
                if s.debug {
                    debug!(requester = %requester, text = %text, "missed page request: log target unset");
                }
                return;
            }
            if s.debug {
                debug!(requester = %requester, text = %text, "page request");
            }

            let request = PageRequest::new(&requester, &text, now);
            let line = {
                let snap = state.snapshot.lock().await;
                recorder::request_line(&request, snap.as_ref())
            };
            state.queue.lock().await.enqueue(request);

            if let Err(e) =
                recorder::append_line(&s.requests_folder_path, &s.requests_file_name, now, &line)
            {
                warn!(err = %e, "failed to write request log line");
            }
        }
        Classification::AdminReply { admin, text } => {
            if s.responses_folder_path.is_empty() || s.responses_file_name.is_empty() {
                if s.debug {
                    debug!(admin = %admin, "missed admin response: log target unset");
                }
                return;
            }
            if s.debug {
                debug!(admin = %admin, text = %text, "admin response");
            }

            let outcomes = state.queue.lock().await.flush(
                &admin,
                &text,
                now,
                TimeDelta::minutes(s.fail_time_minutes),
            );
            let snap = state.snapshot.lock().await.clone();

            // A line that fails to persist is reported and lost; the queue
            // was already drained and is not rolled back.
            for outcome in &outcomes {
                let Some(line) = recorder::outcome_line(outcome, snap.as_ref(), s.fail_time_minutes)
                else {
                    continue;
                };
                if let Err(e) = recorder::append_line(
                    &s.responses_folder_path,
                    &s.responses_file_name,
                    now,
                    &line,
                ) {
                    warn!(err = %e, "failed to write response log line");
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CtlReq {
    Set {
        key: String,
        value: String,
    },
    AdminAdd {
        name: String,
    },
    AdminRemove {
        name: String,
    },
    AdminsSet {
        names: Vec<String>,
    },
    Show {},
    Say {
        scope: String,
        text: String,
    },
    Yell {
        scope: String,
        text: String,
        #[serde(default)]
        duration_s: Option<u32>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CtlResp {
    Ok {},
    OkShow {
        settings: Settings,
        admins: Vec<String>,
        pending: usize,
    },
    OkSent {
        chunks: usize,
    },
    Err {
        message: String,
    },
}

async fn ctl_server_task(bind: SocketAddr, state: State) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(bind = %bind, "control server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_ctl_conn(stream, state).await {
                warn!(peer = %peer, err = %e, "control request failed");
            }
        });
    }
}

async fn handle_ctl_conn(stream: TcpStream, state: State) -> anyhow::Result<()> {
    let (rd, mut wr) = stream.into_split();
    let mut rd = BufReader::new(rd);

    let mut line = String::new();
    let _ = rd.read_line(&mut line).await?;
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let resp = match serde_json::from_str::<CtlReq>(line) {
        Ok(req) => handle_ctl_req(&state, req).await,
        Err(e) => CtlResp::Err {
            message: format!("bad json: {e}"),
        },
    };

    wr.write_all(serde_json::to_string(&resp)?.as_bytes())
        .await?;
    wr.write_all(b"\n").await?;
    Ok(())
}

async fn handle_ctl_req(state: &State, req: CtlReq) -> CtlResp {
    match req {
        CtlReq::Set { key, value } => {
            let Some(key) = SettingKey::parse(&key) else {
                return CtlResp::Err {
                    message: format!("unknown setting: {key:?}"),
                };
            };
            let mut s = state.settings.lock().await;
            match s.apply(key, &value) {
                Ok(()) => {
                    info!(key = key.name(), "setting updated");
                    CtlResp::Ok {}
                }
                Err(e) => {
                    error!(key = key.name(), err = %e, "setting rejected; previous value kept");
                    CtlResp::Err {
                        message: e.to_string(),
                    }
                }
            }
        }
        CtlReq::AdminAdd { name } => {
            if state.roster.lock().await.add(&name) {
                info!(name = %name, "admin added");
                CtlResp::Ok {}
            } else {
                CtlResp::Err {
                    message: format!("not added (blank or duplicate): {name:?}"),
                }
            }
        }
        CtlReq::AdminRemove { name } => {
            if state.roster.lock().await.remove(&name) {
                info!(name = %name, "admin removed");
                CtlResp::Ok {}
            } else {
                CtlResp::Err {
                    message: format!("not on roster: {name:?}"),
                }
            }
        }
        CtlReq::AdminsSet { names } => {
            let mut roster = state.roster.lock().await;
            roster.set_all(names);
            info!(admins = roster.len(), "roster replaced");
            CtlResp::Ok {}
        }
        CtlReq::Show {} => {
            let settings = state.settings.lock().await.clone();
            let admins = state.roster.lock().await.names().to_vec();
            let pending = state.queue.lock().await.len();
            CtlResp::OkShow {
                settings,
                admins,
                pending,
            }
        }
        CtlReq::Say { scope, text } => {
            let scope = match ChatScope::parse(&scope) {
                Ok(s) => s,
                Err(e) => {
                    return CtlResp::Err {
                        message: e.to_string(),
                    };
                }
            };
            if state.settings.lock().await.debug {
                debug!(scope = %scope, text = %text, "saying");
            }
            send_chunks(state, chatsplit::split_message(&text, SAY_MAX_CHARS), |chunk| {
                feed::encode_say(&scope, chunk)
            })
            .await
        }
        CtlReq::Yell {
            scope,
            text,
            duration_s,
        } => {
            let scope = match ChatScope::parse(&scope) {
                Ok(s) => s,
                Err(e) => {
                    return CtlResp::Err {
                        message: e.to_string(),
                    };
                }
            };
            let duration_s = duration_s.unwrap_or(YELL_DEFAULT_SECS);
            let len = text.chars().count();
            if len > YELL_MAX_CHARS {
                // Reported, not truncated; the text still goes out.
                warn!(len, max = YELL_MAX_CHARS, "yell text exceeds channel cap");
            }
            if state.settings.lock().await.debug {
                debug!(scope = %scope, duration_s, text = %text, "yelling");
            }
            send_chunks(
                state,
                chatsplit::split_message(&text, YELL_MAX_CHARS),
                |chunk| feed::encode_yell(&scope, duration_s, chunk),
            )
            .await
        }
    }
}

async fn send_chunks<F>(state: &State, chunks: Vec<String>, encode: F) -> CtlResp
where
    F: Fn(&str) -> String,
{
    let n = chunks.len();
    for chunk in &chunks {
        if state.out_tx.send(encode(chunk)).await.is_err() {
            return CtlResp::Err {
                message: "chat feed writer is gone".to_string(),
            };
        }
    }
    CtlResp::OkSent { chunks: n }
}

#[cfg(test)]
mod tests {
    use super::{CtlReq, backoff_delay};
    use std::time::Duration;

    #[test]
    fn ctl_requests_parse_from_json_lines() {
        let req: CtlReq =
            serde_json::from_str(r#"{"type":"set","key":"fail_time_minutes","value":"45"}"#)
                .unwrap();
        assert!(matches!(req, CtlReq::Set { .. }));

        let req: CtlReq = serde_json::from_str(r#"{"type":"admin_add","name":"Mike"}"#).unwrap();
        assert!(matches!(req, CtlReq::AdminAdd { name } if name == "Mike"));

        let req: CtlReq =
            serde_json::from_str(r#"{"type":"yell","scope":"all","text":"hi"}"#).unwrap();
        assert!(matches!(
            req,
            CtlReq::Yell {
                duration_s: None,
                ..
            }
        ));
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
        assert_eq!(backoff_delay(60), Duration::from_secs(30));
    }
}
