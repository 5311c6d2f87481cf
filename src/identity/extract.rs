use super::Identity;

pub const PREFIX: &[u8] = br#"{"params":"#;

const MARKER: &[u8] = br#"","#;
const QUOTE:  usize = 3;

const COINS: [(&[u8], &str); 2] = [
    (br#""BSV-"#, "BSV"),
    (br#""BCH-"#, "BCH"),
];

const CONTROL: [&[u8]; 4] = [
    b"mining.authorize",
    b"mining.subscribe",
    b"mining.suggest_difficulty",
    b"mining.configure",
];

#[derive(Debug, Eq, PartialEq)]
pub enum Scan {
    Identity(Identity),
    Control,
    Unknown,
}

/// Extracts the worker group and coin from a payload starting with
/// `{"params": ["<group>", "<coin>-...`. Anything else yields an empty
/// identity.
pub fn extract(payload: &[u8]) -> Identity {
    if !payload.starts_with(PREFIX) {
        return Identity::default();
    }

    let marker = match find(&payload[PREFIX.len()..], MARKER) {
        Some(n) => PREFIX.len() + n,
        None    => return Identity::default(),
    };

    let start = PREFIX.len() + QUOTE;
    let group = match payload.get(start..marker) {
        Some(group) => String::from_utf8_lossy(group).into_owned(),
        None        => return Identity::default(),
    };

    let rest = &payload[marker..];
    let coin = COINS.iter().find(|(tag, _)| find(rest, tag).is_some());
    let coin = coin.map(|(_, coin)| coin.to_string()).unwrap_or_default();

    Identity {
        worker_group: group,
        coin:         coin,
    }
}

/// Classifies a registration payload. Several newline-delimited stratum
/// messages may share a segment, so the prefix is searched for rather than
/// required at offset zero.
pub fn scan(payload: &[u8]) -> Scan {
    if let Some(n) = find(payload, PREFIX) {
        let identity = extract(&payload[n..]);
        if !identity.is_empty() {
            return Scan::Identity(identity);
        }
    }

    match CONTROL.iter().any(|method| find(payload, method).is_some()) {
        true  => Scan::Control,
        false => Scan::Unknown,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
