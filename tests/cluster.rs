//! Real worker processes behind one shared port.
#![cfg(unix)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;

use workvisor::{
    ConfigSnapshot, Event, EventKind, LoopExit, ProcessLauncher, ServerConfig, SharedListener,
    Supervisor, SupervisorConfig, SupervisorHandle, WorkerCount,
};

const PATIENCE: Duration = Duration::from_secs(20);

fn site(body: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), body).unwrap();
    dir
}

fn server_config(root: &Path, addr: SocketAddr, workers: usize) -> ServerConfig {
    ServerConfig {
        root: root.to_path_buf(),
        host: addr.ip().to_string(),
        port: addr.port(),
        workers: WorkerCount::Fixed(workers),
        ..ServerConfig::default()
    }
}

async fn start(server: &ServerConfig, listener: &SharedListener) -> (SupervisorHandle, broadcast::Receiver<Event>) {
    let launcher = ProcessLauncher::new(env!("CARGO_BIN_EXE_workvisor"))
        .arg("worker")
        .with_listener(listener);
    let cfg = SupervisorConfig {
        grace: Duration::from_secs(5),
        ..SupervisorConfig::from_server(server)
    };
    let sup = Supervisor::builder(cfg).build();
    let events = sup.subscribe();
    let handle = sup
        .start(Arc::new(launcher), ConfigSnapshot::new(server.clone()))
        .await
        .unwrap();
    (handle, events)
}

async fn wait_for(events: &mut broadcast::Receiver<Event>, kind: EventKind, n: usize) -> Vec<Event> {
    let mut seen = Vec::new();
    timeout(PATIENCE, async {
        while seen.len() < n {
            match events.recv().await {
                Ok(ev) if ev.kind == kind => seen.push(ev),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed while waiting for {kind:?}"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {n} {kind:?}"));
    seen
}

async fn get(addr: SocketAddr) -> (u16, String) {
    let mut sock = TcpStream::connect(addr).await.unwrap();
    sock.write_all(b"GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await.unwrap();
    let mut raw = String::new();
    sock.read_to_string(&mut raw).await.unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    (status, body.to_string())
}

async fn drained(handle: &SupervisorHandle) {
    timeout(PATIENCE, async {
        while !handle.status().await.unwrap().draining.is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("draining workers never exited");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn workers_serve_reload_and_stop() {
    let v1 = site("v1");
    let v2 = site("v2");
    let listener = SharedListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = server_config(v1.path(), addr, 2);
    let (handle, mut events) = start(&server, &listener).await;
    wait_for(&mut events, EventKind::WorkerReady, 2).await;

    for _ in 0..4 {
        assert_eq!(get(addr).await, (200, "v1".to_string()));
    }

    let next = ConfigSnapshot::new(server_config(v2.path(), addr, 2));
    let generation = next.generation();
    let report = handle.reload(next).await.unwrap();
    assert_eq!(report.replaced, 2);
    assert_eq!(report.generation, generation);

    drained(&handle).await;
    for _ in 0..4 {
        assert_eq!(get(addr).await, (200, "v2".to_string()));
    }

    let stopped = handle.stop(false).await.unwrap();
    assert_eq!(stopped.workers, 2);
    assert_eq!(handle.wait().await, LoopExit::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn killed_worker_is_respawned() {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let root = site("alive");
    let listener = SharedListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let (handle, mut events) = start(&server_config(root.path(), addr, 2), &listener).await;
    wait_for(&mut events, EventKind::WorkerReady, 2).await;

    let before = handle.status().await.unwrap();
    let victim = &before.workers[0];
    let pid = victim.pid.unwrap();
    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).unwrap();

    let crash = wait_for(&mut events, EventKind::WorkerCrashed, 1).await;
    assert_eq!(crash[0].worker, Some(victim.id));
    assert_eq!(crash[0].signal, Some(9));
    let ready = wait_for(&mut events, EventKind::WorkerReady, 1).await;
    assert_eq!(ready[0].slot, Some(victim.slot));

    let after = handle.status().await.unwrap();
    assert_eq!(after.live(), 2);
    assert_eq!(after.workers[0].failures, 1);
    assert_eq!(get(addr).await, (200, "alive".to_string()));

    handle.stop(true).await.unwrap();
    assert_eq!(handle.wait().await, LoopExit::Stopped);
}
