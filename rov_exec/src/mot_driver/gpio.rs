//! Raspberry Pi GPIO implementation of the motor HAL

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use rppal::gpio::{Gpio, OutputPin};

use super::{GpioPins, HalError, MotorHal, Wheel};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// H-bridge driven directly from the Pi's GPIO, with software PWM on the speed pins.
pub struct GpioHal {
    stby: OutputPin,
    left: Channel,
    right: Channel,
    pwm_frequency_hz: f64,
}

struct Channel {
    pwm: OutputPin,
    in1: OutputPin,
    in2: OutputPin,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GpioHal {
    /// Claim the pins and leave every output low.
    pub fn new(pins: &GpioPins, pwm_frequency_hz: f64) -> Result<Self, HalError> {
        let gpio = Gpio::new().map_err(gpio_err)?;

        let output = |pin: u8| -> Result<OutputPin, HalError> {
            let mut p = gpio.get(pin).map_err(gpio_err)?.into_output();
            p.set_low();
            Ok(p)
        };

        let hal = Self {
            stby: output(pins.stby)?,
            left: Channel {
                pwm: output(pins.pwm_a)?,
                in1: output(pins.ain1)?,
                in2: output(pins.ain2)?,
            },
            right: Channel {
                pwm: output(pins.pwm_b)?,
                in1: output(pins.bin1)?,
                in2: output(pins.bin2)?,
            },
            pwm_frequency_hz,
        };

        debug!("Motor GPIO claimed: {:?}", pins);

        Ok(hal)
    }

    fn channel(&mut self, wheel: Wheel) -> &mut Channel {
        match wheel {
            Wheel::Left => &mut self.left,
            Wheel::Right => &mut self.right,
        }
    }
}

impl MotorHal for GpioHal {
    fn set_duty_cycle(&mut self, wheel: Wheel, duty: f64) -> Result<(), HalError> {
        if !(0.0..=1.0).contains(&duty) {
            return Err(HalError::InvalidDutyCycle(duty));
        }

        let freq = self.pwm_frequency_hz;
        let pin = &mut self.channel(wheel).pwm;

        if duty == 0.0 {
            pin.clear_pwm().map_err(gpio_err)?;
            pin.set_low();
        } else {
            pin.set_pwm_frequency(freq, duty).map_err(gpio_err)?;
        }

        Ok(())
    }

    fn set_direction(&mut self, wheel: Wheel, in1: bool, in2: bool) -> Result<(), HalError> {
        let ch = self.channel(wheel);
        set_level(&mut ch.in1, in1);
        set_level(&mut ch.in2, in2);
        Ok(())
    }

    fn set_standby(&mut self, enabled: bool) -> Result<(), HalError> {
        set_level(&mut self.stby, enabled);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn set_level(pin: &mut OutputPin, high: bool) {
    if high {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

fn gpio_err(e: rppal::gpio::Error) -> HalError {
    HalError::Gpio(e.to_string())
}
