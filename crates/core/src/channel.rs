//! Named, time-ordered value channels.
//!
//! A channel models a continuously available last-known value rather than a
//! strict message queue: `latest()` peeks and may be repeated any number of
//! times, and `nonempty()` stays true once a value has been sent, until the
//! channel is reset at the start of the next run.

use crate::KernelError;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// One value sent on a channel, with the virtual time it was sent at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub timestamp: Duration,
}

/// A named mailbox for scalar values.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    history: VecDeque<Sample>,
    /// Maximum retained samples. `None` keeps the full history.
    capacity: Option<usize>,
}

impl Channel {
    /// Create a channel that keeps its full history.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: VecDeque::new(),
            capacity: None,
        }
    }

    /// Create a channel that retains at most `capacity` samples, evicting the
    /// oldest first. A capacity of zero is treated as one.
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: name.into(),
            history: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append a value stamped with `at`.
    pub fn send_at(&mut self, value: f64, at: Duration) {
        if let Some(capacity) = self.capacity {
            while self.history.len() >= capacity {
                self.history.pop_front();
            }
        }
        self.history.push_back(Sample {
            value,
            timestamp: at,
        });
    }

    /// The most recently sent value. Does not consume it.
    pub fn latest(&self) -> Result<f64, KernelError> {
        self.latest_sample().map(|s| s.value)
    }

    /// The most recently sent sample, including its timestamp.
    pub fn latest_sample(&self) -> Result<Sample, KernelError> {
        self.history
            .back()
            .copied()
            .ok_or_else(|| KernelError::EmptyChannel(self.name.clone()))
    }

    /// Whether at least one value was sent since the last reset.
    pub fn nonempty(&self) -> bool {
        !self.history.is_empty()
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Retained samples, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.history.iter()
    }

    /// Retained values, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.value).collect()
    }

    /// Drop all samples. The channel becomes empty again.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

/// All channels of one simulation, keyed by name.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: BTreeMap<String, Channel>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel. Names must be unique.
    pub fn insert(&mut self, channel: Channel) -> Result<(), KernelError> {
        if self.channels.contains_key(channel.name()) {
            return Err(KernelError::DuplicateChannel(channel.name().to_string()));
        }
        self.channels.insert(channel.name().to_string(), channel);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Channel, KernelError> {
        self.channels
            .get(name)
            .ok_or_else(|| KernelError::UnknownChannel(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Channel, KernelError> {
        self.channels
            .get_mut(name)
            .ok_or_else(|| KernelError::UnknownChannel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.keys().map(String::as_str)
    }

    /// Clear every channel's history.
    pub fn reset(&mut self) {
        for channel in self.channels.values_mut() {
            channel.clear();
        }
    }
}
