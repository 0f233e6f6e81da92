//! RtpObservers: router-attached listeners that watch accumulated
//! audio-level samples across bound producers rather than forwarding media
//! . Grounded in
//! `original_source/worker/src/RTC/AudioLevelObserver.cpp` and
//! `ActiveSpeakerObserver.cpp`, which have no teacher counterpart.

pub mod active_speaker;
pub mod audio_level;

pub use active_speaker::ActiveSpeakerObserver;
pub use audio_level::AudioLevelObserver;
