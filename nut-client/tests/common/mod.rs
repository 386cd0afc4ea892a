//! In-process upsd stand-in for integration tests

#![allow(dead_code)]

use nut_client::{ClientBuilder, NutClient};
use nut_session::decode_line;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub const PASSWORD: &str = "secret";

/// How the fake daemon misbehaves
#[derive(Debug, Clone)]
pub struct Behaviour {
    /// Devices reported by `LIST UPS`
    pub devices: Vec<(String, String)>,
    /// Close the socket instead of answering the n-th command (1-based, over all connections)
    pub drop_on_command: Option<usize>,
    /// Close the socket instead of answering any command
    pub drop_always: bool,
    /// Refuse the right password on the n-th connection (1-based)
    pub reject_password_on_connection: Option<usize>,
    /// Close the first list reply with an `END LIST` for another subject
    pub mismatched_list_once: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            devices: vec![
                ("ups1".to_string(), "Main rack".to_string()),
                ("ups2".to_string(), "Backup unit".to_string()),
            ],
            drop_on_command: None,
            drop_always: false,
            reject_password_on_connection: None,
            mismatched_list_once: false,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicUsize,
    commands: AtomicUsize,
    log: Mutex<Vec<String>>,
    list_mismatched: AtomicBool,
}

/// Fake upsd bound to an ephemeral local port
pub struct FakeUpsd {
    pub port: u16,
    counters: Arc<Counters>,
}

impl FakeUpsd {
    pub async fn start() -> Self {
        Self::with_behaviour(Behaviour::default()).await
    }

    pub async fn with_behaviour(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let counters = Arc::new(Counters::default());
        let behaviour = Arc::new(behaviour);

        let accept_counters = counters.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let connection = accept_counters.connections.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::spawn(serve(
                    socket,
                    connection,
                    behaviour.clone(),
                    accept_counters.clone(),
                ));
            }
        });

        Self { port, counters }
    }

    /// Number of TCP connections accepted so far
    pub fn connections(&self) -> usize {
        self.counters.connections.load(Ordering::SeqCst)
    }

    /// Every command line received, in order
    pub fn commands(&self) -> Vec<String> {
        self.counters.log.lock().unwrap().clone()
    }

    pub fn builder(&self) -> ClientBuilder {
        ClientBuilder::new()
            .host("127.0.0.1")
            .port(self.port)
            .command_timeout(Duration::from_millis(500))
    }

    pub fn client(&self) -> NutClient {
        self.builder().build().unwrap()
    }
}

async fn serve(
    socket: TcpStream,
    connection: usize,
    behaviour: Arc<Behaviour>,
    counters: Arc<Counters>,
) {
    let (read, mut write) = socket.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut username: Option<String> = None;
    let mut authenticated = false;

    while let Ok(Some(line)) = lines.next_line().await {
        let n = counters.commands.fetch_add(1, Ordering::SeqCst) + 1;
        counters.log.lock().unwrap().push(line.clone());
        if behaviour.drop_always || behaviour.drop_on_command == Some(n) {
            return;
        }

        let fields = decode_line(line.as_bytes()).unwrap_or_default();
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        let reply = match fields.as_slice() {
            ["USERNAME", name] => {
                if username.is_some() {
                    "ERR ALREADY-SET-USERNAME\n".to_string()
                } else {
                    username = Some(name.to_string());
                    "OK\n".to_string()
                }
            }
            ["PASSWORD", password] => {
                if username.is_none() {
                    "ERR USERNAME-REQUIRED\n".to_string()
                } else if *password == PASSWORD
                    && behaviour.reject_password_on_connection != Some(connection)
                {
                    authenticated = true;
                    "OK\n".to_string()
                } else {
                    "ERR ACCESS-DENIED\n".to_string()
                }
            }
            ["LOGOUT"] => {
                let _ = write.write_all(b"OK Goodbye\n").await;
                return;
            }
            ["VER"] => "Network UPS Tools upsd 2.8.1 - https://networkupstools.org/\n".to_string(),
            ["NETVER"] => "1.3\n".to_string(),
            ["LIST", "UPS"] => {
                let mut reply = "BEGIN LIST UPS\n".to_string();
                for (name, description) in &behaviour.devices {
                    reply.push_str(&format!("UPS {} \"{}\"\n", name, description));
                }
                reply.push_str("END LIST UPS\n");
                reply
            }
            ["LIST" | "GET" | "SET", _, ups, ..] | ["INSTCMD", ups, ..]
                if !is_known(&behaviour, ups) =>
            {
                "ERR UNKNOWN-UPS\n".to_string()
            }
            ["LIST", "VAR", ups] => format!(
                "BEGIN LIST VAR {ups}\n\
                 VAR {ups} battery.charge \"100\"\n\
                 VAR {ups} ups.status \"OL\"\n\
                 END LIST VAR {ups}\n"
            ),
            ["LIST", "RW", ups] => format!(
                "BEGIN LIST RW {ups}\nRW {ups} ups.id \"rack\"\nEND LIST RW {ups}\n"
            ),
            ["LIST", "CMD", ups] => format!(
                "BEGIN LIST CMD {ups}\n\
                 CMD {ups} beeper.toggle\n\
                 CMD {ups} test.battery.start\n\
                 END LIST CMD {ups}\n"
            ),
            ["LIST", "ENUM", ups, "input.transfer.low"] => format!(
                "BEGIN LIST ENUM {ups} input.transfer.low\n\
                 ENUM {ups} input.transfer.low \"90\"\n\
                 ENUM {ups} input.transfer.low \"100\"\n\
                 END LIST ENUM {ups} input.transfer.low\n"
            ),
            ["LIST", "CLIENT", ups] => format!(
                "BEGIN LIST CLIENT {ups}\nCLIENT {ups} 127.0.0.1\nEND LIST CLIENT {ups}\n"
            ),
            ["GET", "VAR", ups, "battery.charge"] => format!("VAR {ups} battery.charge \"100\"\n"),
            ["GET", "VAR", ups, "ups.status"] => format!("VAR {ups} ups.status \"OL\"\n"),
            ["GET", "VAR", _, _] => "ERR VAR-NOT-SUPPORTED\n".to_string(),
            ["GET", "UPSDESC", ups] => {
                let description = behaviour
                    .devices
                    .iter()
                    .find(|(name, _)| name.as_str() == *ups)
                    .map(|(_, description)| description.clone())
                    .unwrap_or_default();
                format!("UPSDESC {ups} \"{description}\"\n")
            }
            ["GET", "DESC", ups, "battery.charge"] => {
                format!("DESC {ups} battery.charge \"Battery charge (percent of full)\"\n")
            }
            ["GET", "TYPE", ups, "battery.charge"] => format!("TYPE {ups} battery.charge NUMBER\n"),
            ["GET", "TYPE", ups, "ups.id"] => format!("TYPE {ups} ups.id RW STRING:32\n"),
            ["GET", "TYPE", ups, "input.transfer.low"] => {
                format!("TYPE {ups} input.transfer.low RW ENUM\n")
            }
            ["GET", "CMDDESC", ups, "beeper.toggle"] => {
                format!("CMDDESC {ups} beeper.toggle \"Toggle the UPS beeper\"\n")
            }
            ["GET", "CMDDESC", ups, "test.battery.start"] => {
                format!("CMDDESC {ups} test.battery.start \"Start a battery test\"\n")
            }
            ["GET", "NUMLOGINS", ups] => format!("NUMLOGINS {ups} 1\n"),
            ["SET", "VAR", _, "ups.id", _] if authenticated => "OK\n".to_string(),
            ["SET", "VAR", _, "battery.charge", _] if authenticated => "ERR READONLY\n".to_string(),
            ["SET", "VAR", ..] => "ERR ACCESS-DENIED\n".to_string(),
            ["INSTCMD", _, "no.reply", ..] => continue,
            ["INSTCMD", _, "beeper.toggle"] | ["INSTCMD", _, "test.battery.start", _] => {
                "OK\n".to_string()
            }
            ["INSTCMD", ..] => "ERR CMD-NOT-SUPPORTED\n".to_string(),
            _ => "ERR UNKNOWN-COMMAND\n".to_string(),
        };

        let reply = if fields.first() == Some(&"LIST")
            && behaviour.mismatched_list_once
            && !counters.list_mismatched.swap(true, Ordering::SeqCst)
        {
            mismatch_end(&reply)
        } else {
            reply
        };

        if write.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

/// Replace the `END LIST` line of a list reply with one for another subject
fn mismatch_end(reply: &str) -> String {
    match reply.rfind("END LIST") {
        Some(end) => format!("{}END LIST VAR other\n", &reply[..end]),
        None => reply.to_string(),
    }
}

fn is_known(behaviour: &Behaviour, ups: &str) -> bool {
    behaviour.devices.iter().any(|(name, _)| name == ups)
}
