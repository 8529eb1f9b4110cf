//! # Anchor Recording and Alias Replay
//!
//! YAML lets a node carry an anchor (`&name`) and be referenced later by
//! an alias (`*name`). The loader expands aliases by recording the event
//! run of every anchored node and replaying it at each alias site.
//!
//! ## Mechanics
//!
//! - A recording opens when any scalar, sequence-start or mapping-start
//!   event carries an anchor. Scalars complete immediately; containers
//!   complete when the nesting depth returns to the depth at which they
//!   opened. YAML guarantees proper nesting, so recordings complete in
//!   LIFO order; this is asserted rather than assumed.
//! - Events are appended to every open recording, so nested anchors each
//!   capture their own complete run.
//! - An alias looks up the completed recordings newest-first and pushes a
//!   queue of cloned events onto the replay stack. Aliases inside a
//!   replayed run re-enter the lookup, so aliases nested in anchored
//!   content expand correctly.
//! - Events produced during replay are not re-recorded; their recordings
//!   already exist.
//!
//! The `NO_ALIAS` configuration flag disables recording entirely and
//! makes any alias an immediate error.

use std::collections::VecDeque;

use halyard_core::{Config, ConfigFlags, Error, LogLevel};

use crate::event::{Event, Mark, Source};
use crate::log;

/// The recorded event run of one anchored node.
#[derive(Debug)]
struct Recording {
    /// Anchor identifier the run belongs to.
    anchor: usize,
    /// Container depth at which the recording opened; the recording
    /// completes when an end event returns the stream to this depth.
    open_depth: usize,
    /// The captured events.
    events: Vec<(Event, Mark)>,
}

/// Event source wrapped with anchor recording and alias replay.
pub struct EventStream<'input> {
    source: Source<'input>,
    /// Recordings whose end event is still pending.
    in_progress: Vec<Recording>,
    /// Finished recordings, searched newest-first on alias.
    completed: Vec<Recording>,
    /// Current container nesting depth in the real event stream.
    depth: usize,
    /// Stack of replay queues; the top queue feeds the loader first.
    replay: Vec<VecDeque<(Event, Mark)>>,
}

impl<'input> EventStream<'input> {
    /// Wrap a UTF-8 document.
    pub fn new(text: &'input str) -> Self {
        Self {
            source: Source::new(text),
            in_progress: Vec::new(),
            completed: Vec::new(),
            depth: 0,
            replay: Vec::new(),
        }
    }

    /// Pull the next event, expanding aliases transparently.
    ///
    /// The caller never sees an alias event: the stream either fails
    /// (`NO_ALIAS`, unknown anchor) or switches to replay and returns
    /// the first recorded event instead.
    pub fn next_event(&mut self, config: &Config) -> Result<(Event, Mark), Error> {
        loop {
            if let Some(queue) = self.replay.last_mut() {
                match queue.pop_front() {
                    None => {
                        self.replay.pop();
                        continue;
                    }
                    Some((event, mark)) => {
                        if self.replay.last().is_some_and(VecDeque::is_empty) {
                            self.replay.pop();
                        }
                        if let Event::Alias { id } = event {
                            self.begin_replay(config, id, mark)?;
                            continue;
                        }
                        return Ok((event, mark));
                    }
                }
            }

            let (event, mark) = self.source.next_event(config)?;
            if let Event::Alias { id } = event {
                if config.flags.contains(ConfigFlags::NO_ALIAS) {
                    log::emit(
                        config,
                        LogLevel::Error,
                        &format!(
                            "alias at line {} column {} with aliases disabled",
                            mark.line, mark.col
                        ),
                    );
                    return Err(Error::AliasUnsupported);
                }
                // The alias event itself belongs to any open recording,
                // so anchored content containing aliases replays whole.
                self.observe(config, &event, mark);
                self.begin_replay(config, id, mark)?;
                continue;
            }
            if !config.flags.contains(ConfigFlags::NO_ALIAS) {
                self.observe(config, &event, mark);
            }
            return Ok((event, mark));
        }
    }

    /// Feed one real event through the recorder.
    fn observe(&mut self, config: &Config, event: &Event, mark: Mark) {
        let anchor = match event {
            Event::Scalar { anchor, .. }
            | Event::SequenceStart { anchor }
            | Event::MappingStart { anchor } => *anchor,
            _ => 0,
        };
        if anchor != 0 {
            log::emit(
                config,
                LogLevel::Debug,
                &format!("recording anchor {anchor} from line {}", mark.line),
            );
            self.in_progress.push(Recording {
                anchor,
                open_depth: self.depth,
                events: Vec::new(),
            });
        }

        for recording in &mut self.in_progress {
            recording.events.push((event.clone(), mark));
        }

        match event {
            Event::Scalar { .. } => {
                if anchor != 0 {
                    // A scalar recording is complete the moment its one
                    // event lands.
                    if let Some(recording) = self.in_progress.pop() {
                        debug_assert_eq!(recording.anchor, anchor);
                        self.completed.push(recording);
                    }
                }
            }
            Event::SequenceStart { .. } | Event::MappingStart { .. } => {
                self.depth += 1;
            }
            Event::SequenceEnd | Event::MappingEnd => {
                self.depth = self.depth.saturating_sub(1);
                // Containers close in LIFO order, so completed
                // recordings always sit at the tail.
                while let Some(last) = self.in_progress.last() {
                    if last.open_depth != self.depth {
                        debug_assert!(
                            last.open_depth < self.depth,
                            "recordings must complete in LIFO order"
                        );
                        break;
                    }
                    if let Some(recording) = self.in_progress.pop() {
                        self.completed.push(recording);
                    }
                }
            }
            _ => {}
        }
    }

    /// Switch to replaying the recording of anchor `id`.
    fn begin_replay(&mut self, config: &Config, id: usize, mark: Mark) -> Result<(), Error> {
        // Newest-first: a redefined anchor shadows earlier recordings.
        let recording = self
            .completed
            .iter()
            .rev()
            .find(|r| r.anchor == id);
        let Some(recording) = recording else {
            log::emit(
                config,
                LogLevel::Error,
                &format!(
                    "alias at line {} column {} has no completed recording",
                    mark.line, mark.col
                ),
            );
            return Err(Error::InvalidAlias);
        };
        log::emit(
            config,
            LogLevel::Debug,
            &format!("replaying anchor {id} ({} events)", recording.events.len()),
        );
        self.replay
            .push(recording.events.iter().cloned().collect());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(text: &str, config: &Config) -> Result<Vec<Event>, Error> {
        let mut stream = EventStream::new(text);
        let mut events = Vec::new();
        loop {
            let (event, _) = stream.next_event(config)?;
            let done = event == Event::StreamEnd;
            events.push(event);
            if done {
                return Ok(events);
            }
        }
    }

    fn scalars(events: &[Event]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Scalar { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_scalar_alias_replays_value() {
        let events = drain("a: &x 1\nb: *x\n", &Config::new()).unwrap();
        assert_eq!(scalars(&events), ["a", "1", "b", "1"]);
    }

    #[test]
    fn test_sequence_alias_replays_whole_run() {
        let events = drain("a: &s [1, 2]\nb: *s\n", &Config::new()).unwrap();
        assert_eq!(scalars(&events), ["a", "1", "2", "b", "1", "2"]);
        let seq_starts = events
            .iter()
            .filter(|e| matches!(e, Event::SequenceStart { .. }))
            .count();
        assert_eq!(seq_starts, 2);
    }

    #[test]
    fn test_alias_inside_recording_expands() {
        let text = "a: &x 1\nb: &pair [*x, 2]\nc: *pair\n";
        let events = drain(text, &Config::new()).unwrap();
        assert_eq!(scalars(&events), ["a", "1", "b", "1", "2", "c", "1", "2"]);
    }

    #[test]
    fn test_no_alias_flag_rejects() {
        let cfg = Config::new().with_flags(ConfigFlags::NO_ALIAS);
        assert_eq!(
            drain("a: &x 1\nb: *x\n", &cfg),
            Err(Error::AliasUnsupported)
        );
    }

    #[test]
    fn test_alias_to_open_recording_is_invalid() {
        // The parser resolves the name, but the container recording has
        // not completed at the alias site.
        assert_eq!(
            drain("a: &x [*x]\n", &Config::new()),
            Err(Error::InvalidAlias)
        );
    }
}
