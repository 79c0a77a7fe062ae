//! Common-anode RGB LED bank over the Raspberry Pi GPIO header.
//!
//! One (R, G, B) BCM pin triplet per task index, in task order. Common-anode
//! wiring means a pin driven LOW lights its color; all-HIGH is off.

use anyhow::{Context as _, Result};
use rppal::gpio::{Gpio, OutputPin};
use std::sync::Mutex;

use super::StatusSink;
use crate::store::TaskStatus;

struct RgbLed {
    r: OutputPin,
    g: OutputPin,
    b: OutputPin,
}

impl RgbLed {
    /// (red, green, blue) where `true` lights the channel.
    fn set(&mut self, channels: (bool, bool, bool)) {
        let (r, g, b) = channels;
        set_channel(&mut self.r, r);
        set_channel(&mut self.g, g);
        set_channel(&mut self.b, b);
    }
}

fn set_channel(pin: &mut OutputPin, lit: bool) {
    if lit {
        pin.set_low();
    } else {
        pin.set_high();
    }
}

fn color_for(status: TaskStatus) -> (bool, bool, bool) {
    match status {
        TaskStatus::NotStarted => (true, false, false), // red
        TaskStatus::InProgress => (true, true, false),  // yellow
        TaskStatus::Completed => (false, true, false),  // green
    }
}

/// The configured LEDs, claimed once at startup.
pub struct GpioLedBank {
    leds: Mutex<Vec<RgbLed>>,
}

impl GpioLedBank {
    pub fn new(pin_triplets: &[(u8, u8, u8)]) -> Result<Self> {
        let gpio = Gpio::new().context("failed to open GPIO peripheral")?;
        let mut leds = Vec::with_capacity(pin_triplets.len());
        for &(r, g, b) in pin_triplets {
            let mut led = RgbLed {
                r: claim_output(&gpio, r)?,
                g: claim_output(&gpio, g)?,
                b: claim_output(&gpio, b)?,
            };
            led.set((false, false, false)); // start dark
            leds.push(led);
        }
        Ok(GpioLedBank {
            leds: Mutex::new(leds),
        })
    }
}

fn claim_output(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    let mut out = gpio
        .get(pin)
        .with_context(|| format!("failed to claim GPIO pin {pin}"))?
        .into_output();
    out.set_high(); // off for common-anode
    Ok(out)
}

impl StatusSink for GpioLedBank {
    fn apply(&self, task_index: usize, status: TaskStatus) -> Result<()> {
        let mut leds = self
            .leds
            .lock()
            .map_err(|_| anyhow::anyhow!("LED bank mutex poisoned"))?;
        // Tasks beyond the wired LEDs simply have no light to update.
        if task_index == 0 {
            return Ok(());
        }
        if let Some(led) = leds.get_mut(task_index - 1) {
            led.set(color_for(status));
        }
        Ok(())
    }

    fn enabled(&self) -> bool {
        true
    }
}
