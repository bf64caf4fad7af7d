use crate::cli::RunArgs;

use anyhow::Result;
use diningphils::{AnsiScreen, RenderSink, SafetyMonitor, Table, TracingSink};
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn is_quit(line: &str) -> bool {
  let cmd = line.trim();
  cmd.eq_ignore_ascii_case("q") || cmd.eq_ignore_ascii_case("quit")
}

/// Forwards stdin lines from a plain thread, so a pending read never holds up
/// runtime shutdown. The channel closes at end of input.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
  let (tx, rx) = mpsc::unbounded_channel();
  std::thread::spawn(move || {
    for line in std::io::stdin().lock().lines() {
      match line {
        Ok(line) => {
          if tx.send(line).is_err() {
            break;
          }
        }
        Err(e) => {
          tracing::warn!(error = %e, "Failed to read stdin, treating as end of input");
          break;
        }
      }
    }
  });
  rx
}

pub async fn run(args: RunArgs) -> Result<ExitCode> {
  let config = args.to_config();
  let sink: Arc<dyn RenderSink> = if args.plain {
    Arc::new(TracingSink)
  } else {
    Arc::new(AnsiScreen::stdout())
  };
  let table = Table::with_sink(config, sink.clone())?;
  let monitor = args
    .verify
    .then(|| SafetyMonitor::new(table.ring()).spawn(table.subscribe()));
  let prompt_line = table.prompt_line();
  let mut input = spawn_stdin_reader();

  let deadline = args.duration.map(Duration::from_secs);
  let timer = async move {
    match deadline {
      Some(d) => tokio::time::sleep(d).await,
      None => std::future::pending::<()>().await,
    }
  };
  tokio::pin!(timer);

  sink.clear();
  table.start()?;
  sink.prompt(prompt_line);
  tracing::info!(
    algorithm = %table.config().algorithm,
    philosophers = table.ring().seats(),
    "Table is set, enter q to stop"
  );

  let result = loop {
    tokio::select! {
      // Only finishes on its own when a philosopher failed.
      res = table.join() => break res,
      line = input.recv() => match line {
        Some(line) if !is_quit(&line) => sink.prompt(prompt_line),
        _ => {
          tracing::info!("Stop requested");
          break table.term().await;
        }
      },
      _ = &mut timer => {
        tracing::info!(?deadline, "Run duration elapsed");
        break table.term().await;
      }
    }
  };

  println!();
  let mut success = match &result {
    Ok(()) => true,
    Err(e) => {
      tracing::error!(error = %e, "Table failed");
      eprintln!("error: {}", e);
      false
    }
  };

  if let Some(monitor) = monitor {
    let report = monitor.finish().await;
    println!("{}", report);
    success &= report.is_safe();
  }

  Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quit_commands() {
    assert!(is_quit("q"));
    assert!(is_quit(" QUIT \n"));
    assert!(!is_quit("quiet"));
    assert!(!is_quit(""));
  }
}
