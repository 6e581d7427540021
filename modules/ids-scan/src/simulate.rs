use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttackKind {
    PortScan,
    BruteForce,
    #[serde(rename = "SQLiAttempt")]
    SqliAttempt,
    MalwareDownload,
    FailedLogin,
}

impl AttackKind {
    pub fn label(self) -> &'static str {
        match self {
            AttackKind::PortScan => "PortScan",
            AttackKind::BruteForce => "BruteForce",
            AttackKind::SqliAttempt => "SQLiAttempt",
            AttackKind::MalwareDownload => "MalwareDownload",
            AttackKind::FailedLogin => "FailedLogin",
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            AttackKind::PortScan => 0.60,
            AttackKind::BruteForce => 0.70,
            AttackKind::SqliAttempt => 0.90,
            AttackKind::MalwareDownload => 0.80,
            AttackKind::FailedLogin => 0.30,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            AttackKind::PortScan => "five or more ports probed",
            AttackKind::BruteForce => "repeated failed logins",
            AttackKind::SqliAttempt => "injection payload in request",
            AttackKind::MalwareDownload => "executable or malware download",
            AttackKind::FailedLogin => "failed password",
        }
    }
}

/// Source address and attack pairs the generator draws from.
pub const ATTACKS: [(&str, AttackKind); 5] = [
    ("10.0.0.5", AttackKind::PortScan),
    ("192.168.1.10", AttackKind::SqliAttempt),
    ("172.16.2.9", AttackKind::BruteForce),
    ("8.8.8.8", AttackKind::FailedLogin),
    ("103.21.244.0", AttackKind::MalwareDownload),
];

#[derive(Debug, Clone, Serialize)]
pub struct SimulatedEvent {
    pub source_ip: &'static str,
    pub event: AttackKind,
    pub timestamp: String,
    pub line: String,
}

fn render(ts: &str, ip: &str, kind: AttackKind) -> String {
    match kind {
        AttackKind::PortScan => format!("{ts} SRC={ip} PORT=21,22,23,80,443,3389"),
        AttackKind::SqliAttempt => format!("{ts} SRC={ip} GET /login?user=admin' OR '1'='1"),
        AttackKind::BruteForce => format!("{ts} SRC={ip} FAILED LOGIN user=root count=12"),
        AttackKind::FailedLogin => format!("{ts} SRC={ip} sshd: Failed password for invalid user admin"),
        AttackKind::MalwareDownload => format!("{ts} SRC={ip} GET /downloads/update.exe"),
    }
}

pub fn simulate_at<R: Rng + ?Sized>(rng: &mut R, now: OffsetDateTime) -> SimulatedEvent {
    let &(source_ip, event) = ATTACKS.choose(rng).unwrap_or(&ATTACKS[0]);
    let timestamp = now
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_default();
    let line = render(&timestamp, source_ip, event);
    SimulatedEvent { source_ip, event, timestamp, line }
}

/// One fabricated attack log line for demos.
pub fn simulate<R: Rng + ?Sized>(rng: &mut R) -> SimulatedEvent {
    simulate_at(rng, OffsetDateTime::now_utc())
}
