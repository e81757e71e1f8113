//! `tgfile`: use a Telegram chat as file storage from the command line.
//!
//! Configuration comes from the environment (see `tgfile_core::config`).

use std::io::Write;

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;

use tgfile_client::{BotClient, ClientConfig};
use tgfile_core::{
    config::Config, models::Message, ports::FileBot, progress::ProgressSample,
    transfer::TransferOptions,
};

const USAGE: &str = "usage:
  tgfile whoami
  tgfile upload <path> [name]
  tgfile info <file_id>
  tgfile download <file_id> <dest>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Whoami,
    Upload { path: String, name: Option<String> },
    Info { file_id: String },
    Download { file_id: String, dest: String },
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let cmd = match args.as_slice() {
        ["whoami"] => Command::Whoami,
        ["upload", path] => Command::Upload {
            path: path.to_string(),
            name: None,
        },
        ["upload", path, name] => Command::Upload {
            path: path.to_string(),
            name: Some(name.to_string()),
        },
        ["info", file_id] => Command::Info {
            file_id: file_id.to_string(),
        },
        ["download", file_id, dest] => Command::Download {
            file_id: file_id.to_string(),
            dest: dest.to_string(),
        },
        _ => bail!("{USAGE}"),
    };
    Ok(cmd)
}

fn render_progress(label: &'static str) -> impl Fn(ProgressSample) + Send + Sync + 'static {
    move |s| {
        let mut err = std::io::stderr().lock();
        let _ = write!(
            err,
            "\r{label} {:>5.1}% ({}/{} bytes)",
            s.fraction * 100.0,
            s.transferred,
            s.total
        );
        let _ = err.flush();
    }
}

/// Lines printed after a successful upload.
fn upload_summary(message: &Message) -> anyhow::Result<Vec<String>> {
    let doc = message
        .document
        .as_ref()
        .context("response message carries no document")?;

    let mut lines = vec![format!("file_id: {}", doc.file_id)];
    if let Some(size) = doc.file_size {
        lines.push(format!("size: {size}"));
    }
    if let Some(at) = message.sent_at() {
        lines.push(format!("sent: {}", at.to_rfc3339()));
    }
    Ok(lines)
}

async fn run(bot: &dyn FileBot, cmd: Command, cancel: CancellationToken) -> anyhow::Result<()> {
    let identity = bot
        .initialize(&cancel)
        .await
        .context("bot initialization failed")?;

    match cmd {
        Command::Whoami => {
            println!("id: {}", identity.id);
            println!("name: {}", identity.first_name);
            println!("username: @{}", identity.username);
        }
        Command::Upload { path, name } => {
            let name = match name {
                Some(n) => n,
                None => std::path::Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .with_context(|| format!("{path} has no file name"))?,
            };
            let mut file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("open {path}"))?;

            let opts = TransferOptions::new()
                .with_progress(render_progress("upload"))
                .with_cancel(cancel);
            let res = bot.send_document(&mut file, &name, opts).await;
            eprintln!();
            let message = res.with_context(|| format!("upload of {path} failed"))?;

            for line in upload_summary(&message)? {
                println!("{line}");
            }
        }
        Command::Info { file_id } => {
            let file = bot
                .get_file(&file_id, &cancel)
                .await
                .with_context(|| format!("lookup of {file_id} failed"))?;
            println!("file_id: {}", file.file_id);
            println!("unique_id: {}", file.file_unique_id);
            println!("path: {}", file.file_path);
            match file.file_size {
                Some(size) => println!("size: {size}"),
                None => println!("size: unknown"),
            }
        }
        Command::Download { file_id, dest } => {
            let file = bot
                .get_file(&file_id, &cancel)
                .await
                .with_context(|| format!("lookup of {file_id} failed"))?;
            let mut out = tokio::fs::File::create(&dest)
                .await
                .with_context(|| format!("create {dest}"))?;

            let opts = TransferOptions::new()
                .with_progress(render_progress("download"))
                .with_cancel(cancel);
            let res = bot.download_file(&mut out, &file.file_path, opts).await;
            eprintln!();
            res.with_context(|| format!("download of {file_id} failed"))?;
            println!("saved: {dest}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tgfile_core::logging::init("tgfile")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cmd = parse_args(&args)?;

    let cfg = Config::load().context("configuration")?;
    let bot = BotClient::new(ClientConfig::from(&cfg))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    run(&bot, cmd, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_subcommands() {
        assert_eq!(parse_args(&args(&["whoami"])).unwrap(), Command::Whoami);
        assert_eq!(
            parse_args(&args(&["upload", "a.txt"])).unwrap(),
            Command::Upload {
                path: "a.txt".to_string(),
                name: None
            }
        );
        assert_eq!(
            parse_args(&args(&["upload", "a.txt", "report.txt"])).unwrap(),
            Command::Upload {
                path: "a.txt".to_string(),
                name: Some("report.txt".to_string())
            }
        );
        assert_eq!(
            parse_args(&args(&["download", "abc", "out.bin"])).unwrap(),
            Command::Download {
                file_id: "abc".to_string(),
                dest: "out.bin".to_string()
            }
        );
    }

    #[test]
    fn upload_summary_reports_document_and_time() {
        let message: Message = serde_json::from_str(
            r#"{"message_id":3,"date":1700000000,
                "document":{"file_id":"abc","file_unique_id":"u","file_size":42}}"#,
        )
        .unwrap();
        assert_eq!(
            upload_summary(&message).unwrap(),
            vec![
                "file_id: abc".to_string(),
                "size: 42".to_string(),
                "sent: 2023-11-14T22:13:20+00:00".to_string(),
            ]
        );

        let bare: Message = serde_json::from_str(r#"{"message_id":4,"date":0}"#).unwrap();
        assert!(upload_summary(&bare).is_err());
    }

    #[test]
    fn rejects_unknown_or_incomplete() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["info"])).is_err());
        assert!(parse_args(&args(&["delete", "x"])).is_err());
    }
}
