/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! GPIO task/event channels: toggle outputs and button inputs.
//!
//! A toggle channel owns one physical pin.  Its only action is "toggle"; the
//! level then persists until the next toggle.  Button inputs turn a debounced
//! press (delivered by the board's button service) into one discrete event.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::board::Pin;
use crate::handle::{Event, EventHandle, NodeId, Task, TaskHandle};

/// Number of GPIOTE task channels.
pub const GPIOTE_CHANNELS: usize = 8;

/// Number of button inputs.
pub const BUTTON_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpioError {
    #[error("GPIOTE channel {0} does not exist (0..{GPIOTE_CHANNELS})")]
    NoSuchChannel(u8),

    #[error("GPIOTE channel {0} is already configured")]
    ChannelInUse(u8),

    #[error("pin {0} is already claimed by another channel")]
    PinInUse(Pin),

    #[error("button {0} does not exist (0..{BUTTON_COUNT})")]
    NoSuchButton(u8),
}

/// Logic level of an output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

// ── Toggle outputs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ToggleChannel {
    pin: Pin,
    level: Level,
}

#[derive(Debug)]
pub struct Gpiote {
    node: NodeId,
    channels: [Option<ToggleChannel>; GPIOTE_CHANNELS],
}

impl Gpiote {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node,
            channels: [None; GPIOTE_CHANNELS],
        }
    }

    /// Put `channel` in task mode driving `pin`, starting at `initial`.
    pub fn configure_toggle(&mut self, channel: u8, pin: Pin, initial: Level) -> Result<(), GpioError> {
        let slot = self
            .channels
            .get(channel as usize)
            .ok_or(GpioError::NoSuchChannel(channel))?;
        if slot.is_some() {
            return Err(GpioError::ChannelInUse(channel));
        }
        if self.channels.iter().flatten().any(|c| c.pin == pin) {
            return Err(GpioError::PinInUse(pin));
        }

        self.channels[channel as usize] = Some(ToggleChannel { pin, level: initial });
        debug!(node = %self.node, channel, pin = %pin, ?initial, "GPIOTE toggle channel configured");
        Ok(())
    }

    pub fn toggle_task(&self, channel: u8) -> TaskHandle {
        TaskHandle::new(self.node, Task::GpioteToggle(channel))
    }

    pub fn level(&self, channel: u8) -> Option<Level> {
        self.channel(channel).map(|c| c.level)
    }

    pub fn pin(&self, channel: u8) -> Option<Pin> {
        self.channel(channel).map(|c| c.pin)
    }

    pub(crate) fn is_configured(&self, channel: u8) -> bool {
        self.channel(channel).is_some()
    }

    /// Flip the level.  Returns the pin and its new level.
    pub(crate) fn toggle(&mut self, channel: u8) -> Option<(Pin, Level)> {
        let ch = self.channels.get_mut(channel as usize)?.as_mut()?;
        ch.level = ch.level.toggled();
        Some((ch.pin, ch.level))
    }

    fn channel(&self, channel: u8) -> Option<&ToggleChannel> {
        self.channels.get(channel as usize)?.as_ref()
    }
}

// ── Button inputs ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ButtonInput {
    pin: Pin,
    held: bool,
    pending_press: bool,
}

#[derive(Debug)]
pub struct Buttons {
    node: NodeId,
    inputs: [Option<ButtonInput>; BUTTON_COUNT],
}

impl Buttons {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node,
            inputs: [None; BUTTON_COUNT],
        }
    }

    pub fn configure(&mut self, index: u8, pin: Pin) -> Result<(), GpioError> {
        let slot = self
            .inputs
            .get_mut(index as usize)
            .ok_or(GpioError::NoSuchButton(index))?;
        *slot = Some(ButtonInput {
            pin,
            held: false,
            pending_press: false,
        });
        debug!(node = %self.node, button = index, pin = %pin, "button configured");
        Ok(())
    }

    pub fn pressed_event(&self, index: u8) -> EventHandle {
        EventHandle::new(self.node, Event::ButtonPressed(index))
    }

    /// A debounced press edge.  The event fires on the next cycle; pressing a
    /// button that is already held does nothing.
    pub fn press(&mut self, index: u8) -> Result<(), GpioError> {
        let input = self.input_mut(index)?;
        if !input.held {
            input.held = true;
            input.pending_press = true;
        }
        Ok(())
    }

    pub fn release(&mut self, index: u8) -> Result<(), GpioError> {
        self.input_mut(index)?.held = false;
        Ok(())
    }

    /// Bit `i` is set while button `i` is held.
    pub fn state_mask(&self) -> u8 {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, b)| matches!(b, Some(input) if input.held))
            .fold(0u8, |mask, (i, _)| mask | (1 << i))
    }

    pub fn pin(&self, index: u8) -> Option<Pin> {
        self.inputs.get(index as usize)?.map(|b| b.pin)
    }

    pub(crate) fn is_configured(&self, index: u8) -> bool {
        matches!(self.inputs.get(index as usize), Some(Some(_)))
    }

    pub(crate) fn tick(&mut self, events: &mut Vec<Event>) {
        for (i, input) in self.inputs.iter_mut().enumerate() {
            if let Some(input) = input {
                if input.pending_press {
                    input.pending_press = false;
                    events.push(Event::ButtonPressed(i as u8));
                }
            }
        }
    }

    fn input_mut(&mut self, index: u8) -> Result<&mut ButtonInput, GpioError> {
        self.inputs
            .get_mut(index as usize)
            .and_then(Option::as_mut)
            .ok_or(GpioError::NoSuchButton(index))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
