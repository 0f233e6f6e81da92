//! Logging: `log` + `env_logger`, with tag-based filtering modeled after
//! `original_source/worker/include/Logger.hpp`'s tag system //! AMBIENT). mediasoup's C++ logger gates entire source files behind a
//! compile-time tag; since Rust's `log` crate already exposes a `target`
//! per call site, a tag is just a filter over that target string instead
//! of a bespoke macro layer.

use std::collections::HashSet;

use log::LevelFilter;

use crate::settings::LogLevel;

/// One of mediasoup's logging tags (`original_source/worker/include/Logger.hpp`),
/// used both as a `--logTags` CLI value and as the `log` `target` every
/// module logs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Info,
    Ice,
    Dtls,
    Rtp,
    Srtp,
    Rtcp,
    Rtx,
    Bwe,
    Score,
    Simulcast,
    Svc,
    Sctp,
    Message,
}

impl LogTag {
    pub fn parse(raw: &str) -> Result<Self, String> {
        Ok(match raw {
            "info" => LogTag::Info,
            "ice" => LogTag::Ice,
            "dtls" => LogTag::Dtls,
            "rtp" => LogTag::Rtp,
            "srtp" => LogTag::Srtp,
            "rtcp" => LogTag::Rtcp,
            "rtx" => LogTag::Rtx,
            "bwe" => LogTag::Bwe,
            "score" => LogTag::Score,
            "simulcast" => LogTag::Simulcast,
            "svc" => LogTag::Svc,
            "sctp" => LogTag::Sctp,
            "message" => LogTag::Message,
            other => return Err(format!("unknown --logTags value: {other}")),
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            LogTag::Info => "info",
            LogTag::Ice => "ice",
            LogTag::Dtls => "dtls",
            LogTag::Rtp => "rtp",
            LogTag::Srtp => "srtp",
            LogTag::Rtcp => "rtcp",
            LogTag::Rtx => "rtx",
            LogTag::Bwe => "bwe",
            LogTag::Score => "score",
            LogTag::Simulcast => "simulcast",
            LogTag::Svc => "svc",
            LogTag::Sctp => "sctp",
            LogTag::Message => "message",
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::None => LevelFilter::Off,
        }
    }
}

/// Installs the global logger. An empty `tags` means "no filtering", i.e.
/// every target logs at `level`; otherwise only targets matching one of
/// `tags` pass through.
pub fn init(level: LogLevel, tags: &[LogTag]) {
    let level_filter: LevelFilter = level.into();
    let allowed: HashSet<&'static str> = tags.iter().map(|t| t.as_str()).collect();

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level_filter);
    if !allowed.is_empty() {
        builder.filter(None, LevelFilter::Off);
        for tag in &allowed {
            builder.filter_module(tag, level_filter);
        }
    }
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(LogTag::parse("bogus").is_err());
    }

    #[test]
    fn known_tags_round_trip_through_their_wire_name() {
        for tag in [LogTag::Ice, LogTag::Dtls, LogTag::Rtp, LogTag::Srtp, LogTag::Sctp] {
            assert_eq!(LogTag::parse(tag.as_str()).unwrap(), tag);
        }
    }
}
