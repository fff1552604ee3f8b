// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

//! AGS10 driver implementing the I2C operations of the AGS10 TVOC sensor
//!
//! Status, TVOC and resistance reads are cached: the sensor needs at least
//! 1.5 s between acquisitions, so each frame is fetched from the bus at most
//! once every 2 seconds and served from memory in between. Every frame
//! carries a CRC-8 which is checked when [`ags10::Ags10::set_check_crc`] is on.
//!
//! The bus is reached through the [`ags10::BusTransport`] trait, implemented
//! for `i2cdev`'s `LinuxI2CDevice`.
//!
//! ## Basic Example
//!
//! Obtaining TVOC and resistance
//!
//!```no_run
//!use ags10_i2c::ags10::Ags10;
//!use std::thread;
//!use std::time::Duration;
//!
//!fn main() {
//!    let mut ags = Ags10::open("/dev/i2c-1").unwrap();
//!    ags.set_check_crc(true);
//!    println!("Firmware version: {}", ags.version().unwrap());
//!
//!    loop {
//!        match ags.total_volatile_organic_compounds_ppb() {
//!            Ok(ppb) => println!("TVOC: {} ppb", ppb),
//!            Err(e) => println!("Error obtaining TVOC. More details: {}", e),
//!        }
//!        if let Ok(kohm) = ags.resistance_kohm() {
//!            println!("Resistance: {:.1} kohm", kohm);
//!        }
//!        thread::sleep(Duration::from_secs(2));
//!    }
//!}
//!```
//!

/// AGS10 driver, bus transport and time source
pub mod ags10;
/// CRC-8 (poly 0x31, init 0xFF) used on every sensor frame
pub mod crc;
