use std::net::SocketAddr;

use anyhow::Context;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

fn usage_and_exit() -> ! {
    eprintln!(
        "pagectl\n\n\
USAGE:\n\
  pagectl [--ctl-addr HOST:PORT] <command> [args...]\n\n\
ENV:\n\
  PAGETRACK_CTL_ADDR  default 127.0.0.1:4081\n\n\
COMMANDS:\n\
  set <key> <value>\n\
      keys: debug, requests_folder_path, requests_file_name,\n\
            responses_folder_path, responses_file_name, fail_time_minutes\n\
  admin-add <name>\n\
  admin-remove <name>\n\
  admins-set <name>[,<name>...]\n\
  show\n\
  say <scope> <text...>\n\
  yell <scope> [--duration SECS] <text...>\n\
      scopes: all | team:<id> | squad:<team>:<id> | player:<name>\n"
    );
    std::process::exit(2);
}

#[derive(Debug, Serialize)]
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
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_s: Option<u32>,
    },
}

async fn send_ctl_req(addr: SocketAddr, req: &CtlReq) -> anyhow::Result<serde_json::Value> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("connect {addr}"))?;
    let line = serde_json::to_string(req)?;
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await?;

    let mut rd = BufReader::new(stream);
    let mut out = Vec::new();
    let _ = rd.read_until(b'\n', &mut out).await?;
    if out.is_empty() {
        anyhow::bail!("empty control response");
    }
    let s = String::from_utf8_lossy(&out);
    let v: serde_json::Value = serde_json::from_str(s.trim())
        .with_context(|| format!("bad json response: {}", s.trim()))?;
    Ok(v)
}

fn take_flag_value(rest: &mut Vec<String>, flag: &str) -> Option<String> {
    let i = rest.iter().position(|a| a == flag)?;
    if i + 1 >= rest.len() {
        usage_and_exit();
    }
    let v = rest.remove(i + 1);
    let _ = rest.remove(i);
    Some(v)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut ctl_addr: SocketAddr = std::env::var("PAGETRACK_CTL_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:4081".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let mut args = std::env::args().skip(1);
    let mut cmd: Option<String> = None;
    let mut rest: Vec<String> = Vec::new();

    while let Some(a) = args.next() {
        if a == "--ctl-addr" {
            let v = args.next().unwrap_or_else(|| usage_and_exit());
            ctl_addr = v.parse().unwrap_or_else(|_| usage_and_exit());
            continue;
        }
        cmd = Some(a);
        rest.extend(args);
        break;
    }

    let Some(cmd) = cmd else { usage_and_exit() };

    let req = match cmd.as_str() {
        "set" => {
            if rest.len() != 2 {
                usage_and_exit();
            }
            CtlReq::Set {
                key: rest[0].clone(),
                value: rest[1].clone(),
            }
        }
        "admin-add" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            CtlReq::AdminAdd {
                name: rest[0].clone(),
            }
        }
        "admin-remove" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            CtlReq::AdminRemove {
                name: rest[0].clone(),
            }
        }
        "admins-set" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            let names = rest[0]
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            CtlReq::AdminsSet { names }
        }
        "show" => {
            if !rest.is_empty() {
                usage_and_exit();
            }
            CtlReq::Show {}
        }
        "say" => {
            if rest.len() < 2 {
                usage_and_exit();
            }
            CtlReq::Say {
                scope: rest[0].clone(),
                text: rest[1..].join(" "),
            }
        }
        "yell" => {
            let mut rest = rest;
            let duration_s = take_flag_value(&mut rest, "--duration")
                .map(|v| v.parse().unwrap_or_else(|_| usage_and_exit()));
            if rest.len() < 2 {
                usage_and_exit();
            }
            CtlReq::Yell {
                scope: rest[0].clone(),
                text: rest[1..].join(" "),
                duration_s,
            }
        }
        _ => usage_and_exit(),
    };

    let resp = send_ctl_req(ctl_addr, &req).await?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}
