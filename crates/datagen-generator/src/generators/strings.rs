//! String-like generators: random strings, regex templates, hashes, bytes,
//! UUIDs and IP addresses.

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random alphanumeric string.
pub fn alphanumeric<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Random string of ASCII letters.
pub fn letters<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(LETTERS[rng.gen_range(0..LETTERS.len())]))
        .collect()
}

pub fn bytes<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Vec<u8> {
    let mut buf = vec![0u8; length];
    rng.fill(buf.as_mut_slice());
    buf
}

/// Hex-encoded SHA-256 of a random alphanumeric string.
pub fn hash<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    let input = alphanumeric(rng, length);
    hex::encode(Sha256::digest(input.as_bytes()))
}

pub fn uuid<R: Rng + ?Sized>(rng: &mut R) -> uuid::Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

pub fn ipv4<R: Rng + ?Sized>(rng: &mut R) -> String {
    let octets: [u8; 4] = rng.gen();
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Class { chars: Vec<char>, count: usize },
}

/// A `string_regex` template: literal text mixed with `[class]{n}` groups.
///
/// A class lists characters and `x-y` intervals, optionally separated by
/// commas: `[a-z,0-9]{4}`, `[A-F]{2}`, `[xyz]{1}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegexTemplate {
    segments: Vec<Segment>,
}

fn group_regex() -> &'static Regex {
    static GROUP: OnceLock<Regex> = OnceLock::new();
    GROUP.get_or_init(|| Regex::new(r"\[([^\]]*)\]\{(\d+)\}").expect("group pattern is valid"))
}

fn parse_class(class: &str) -> Result<Vec<char>, String> {
    let chars: Vec<char> = class.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ',' {
            i += 1;
            continue;
        }
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let end = chars[i + 2];
            if end < c {
                return Err(format!("interval '{c}-{end}' is reversed"));
            }
            out.extend(c..=end);
            i += 3;
        } else {
            out.push(c);
            i += 1;
        }
    }
    if out.is_empty() {
        return Err(format!("character class '[{class}]' is empty"));
    }
    Ok(out)
}

impl RegexTemplate {
    pub fn parse(template: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in group_regex().captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            let chars = parse_class(&caps[1])?;
            let count = caps[2]
                .parse::<usize>()
                .map_err(|e| format!("invalid repetition '{}': {e}", &caps[2]))?;
            segments.push(Segment::Class { chars, count });
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }
        if segments.is_empty() {
            return Err("template is empty".to_string());
        }
        Ok(Self { segments })
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Class { chars, count } => {
                    for _ in 0..*count {
                        out.push(chars[rng.gen_range(0..chars.len())]);
                    }
                }
            }
        }
        out
    }
}
