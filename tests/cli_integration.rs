mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_forecast-bench");

/// Writes `ds,<column>` rows for consecutive hours from 2024-01-01.
fn write_series(name: &str, column: &str, values: &[f64]) -> PathBuf {
    let path = common::scratch_path(name);
    let mut csv = format!("ds,{column}\n");
    for (h, v) in values.iter().enumerate() {
        csv.push_str(&format!("2024-01-{:02}T{:02}:00:00,{v}\n", 1 + h / 24, h % 24));
    }
    fs::write(&path, csv).expect("scratch file should be writable");
    path
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(BIN)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("forecast-bench should run")
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn evaluate_prints_report() {
    let real = write_series("eval-real.csv", "y", &[0.0, 2.0, 4.0, 6.0]);
    let pred = write_series("eval-pred.csv", "yhat", &[1.0, 1.0, 5.0, 5.0]);

    let output = run(&["evaluate", "--real", arg(&real), "--pred", arg(&pred)]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Forecast Accuracy (4 observations) ==="));
    assert!(stdout.contains("RMSE            1.0000"));
    assert!(stdout.contains("n/a"));
}

#[test]
fn compare_writes_matrix_csv() {
    let n = 24 * 30;
    let real: Vec<f64> = (0..n).map(|h| 50.0 + (h % 24) as f64).collect();
    let good: Vec<f64> = real.iter().enumerate().map(|(i, v)| v + if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
    let bad: Vec<f64> = real.iter().enumerate().map(|(i, v)| v + if i % 3 == 0 { 9.0 } else { -4.0 }).collect();
    let real = write_series("cmp-real.csv", "y", &real);
    let good = write_series("cmp-good.csv", "yhat", &good);
    let bad = write_series("cmp-bad.csv", "yhat", &bad);
    let out = common::scratch_path("cmp-matrix.csv");

    let forecasts = format!("good={},bad={}", arg(&good), arg(&bad));
    let output = run(&[
        "compare",
        "--real",
        arg(&real),
        "--forecasts",
        &forecasts,
        "--periods-per-day",
        "24",
        "--out",
        arg(&out),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("DM p-values"));

    let matrix = fs::read_to_string(&out).expect("matrix csv should exist");
    let mut lines = matrix.lines();
    assert_eq!(lines.next(), Some("model,good,bad"));
    assert!(lines.next().is_some_and(|l| l.starts_with("good,,")));
}

#[test]
fn bad_arguments_exit_with_usage_error() {
    let output = run(&["compare", "--test", "ttest"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn missing_input_file_fails() {
    let output = run(&[
        "evaluate",
        "--real",
        "/nonexistent/real.csv",
        "--pred",
        "/nonexistent/pred.csv",
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[cfg(feature = "server")]
mod serve {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::process::{Child, Command, Stdio};
    use std::thread;
    use std::time::{Duration, Instant};

    use serde_json::Value;

    use super::BIN;

    struct ChildGuard {
        child: Child,
    }

    impl Drop for ChildGuard {
        fn drop(&mut self) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }

    #[test]
    fn serve_answers_info_requests() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral port bind should succeed");
            listener.local_addr().expect("local_addr should be available").port()
        };
        let child = Command::new(BIN)
            .args(["serve", "--preset", "weekly_profile", "--port", &port.to_string()])
            .env("FORECAST_BENCH_HOST", "127.0.0.1")
            .env("RUST_LOG", "off")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("forecast-bench should spawn");
        let _guard = ChildGuard { child };

        let addr = format!("127.0.0.1:{port}");
        let body = wait_for_info(&addr, Duration::from_secs(10));
        let info: Value = serde_json::from_str(&body).expect("info body should be JSON");
        assert_eq!(info["name"], "WeeklyProfile.56D.Recalibrated7D");
        assert_eq!(info["type"], "point");
    }

    fn wait_for_info(addr: &str, timeout: Duration) -> String {
        let start = Instant::now();
        loop {
            if let Ok((200, body)) = http_get(addr, "/info") {
                return body;
            }
            if start.elapsed() >= timeout {
                panic!("timed out waiting for forecast server on {addr}");
            }
            thread::sleep(Duration::from_millis(50));
        }
    }

    fn http_get(addr: &str, path: &str) -> Result<(u16, String), String> {
        let mut stream = TcpStream::connect(addr).map_err(|err| format!("connect: {err}"))?;
        let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
        stream
            .write_all(request.as_bytes())
            .map_err(|err| format!("write: {err}"))?;

        let mut raw = String::new();
        stream
            .read_to_string(&mut raw)
            .map_err(|err| format!("read: {err}"))?;

        let (head, body) = raw
            .split_once("\r\n\r\n")
            .ok_or_else(|| "invalid HTTP response".to_string())?;
        let status = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .ok_or_else(|| "missing status code".to_string())?
            .parse::<u16>()
            .map_err(|err| format!("invalid status code: {err}"))?;
        Ok((status, body.to_string()))
    }
}
