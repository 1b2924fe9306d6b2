/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

use std::collections::HashMap;
use std::fmt;

type ValStrMap = HashMap<u8, &'static str>;

pub fn val2str(val: u8, map: &ValStrMap) -> &'static str {
    map.get(&val).copied().unwrap_or("Unknown value")
}

lazy_static::lazy_static! {
    pub static ref COMPLETION_CODE_VALS: ValStrMap = {
        let mut m = HashMap::new();
        m.insert(0x00, "Command completed normally");
        m.insert(0x80, "Record length invalid");
        m.insert(0x83, "NAK on write");
        m.insert(0xc0, "Node busy");
        m.insert(0xc1, "Invalid command");
        m.insert(0xc2, "Invalid command on LUN");
        m.insert(0xc3, "Timeout");
        m.insert(0xc4, "Out of space");
        m.insert(0xc5, "Reservation cancelled or invalid");
        m.insert(0xc6, "Request data truncated");
        m.insert(0xc7, "Request data length invalid");
        m.insert(0xc8, "Request data field length limit exceeded");
        m.insert(0xc9, "Parameter out of range");
        m.insert(0xca, "Cannot return number of requested data bytes");
        m.insert(0xcb, "Requested sensor, data, or record not found");
        m.insert(0xcc, "Invalid data field in request");
        m.insert(0xcd, "Command illegal for specified sensor or record type");
        m.insert(0xce, "Command response could not be provided");
        m.insert(0xcf, "Cannot execute duplicated request");
        m.insert(0xd0, "SDR Repository in update mode");
        m.insert(0xd1, "Device firmeware in update mode");
        m.insert(0xd2, "BMC initialization in progress");
        m.insert(0xd3, "Destination unavailable");
        m.insert(0xd4, "Insufficient privilege level");
        m.insert(0xd5, "Command not supported in present state");
        m.insert(0xd6, "Cannot execute command, command disabled");
        m.insert(0xff, "Unspecified error");
        m
    };
}

/// Errors surfaced by the configuration API. The protocol surface never uses
/// these: malformed requests always come back as a completion code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmuError {
    /// A parameter is out of the range the model accepts
    InvalidParam(String),
    /// The addressed MC does not advertise the needed device support
    NotSupported(String),
    /// No MC registered at the given IPMB address
    NoSuchMc(u8),
    /// No sensor at the given LUN/number
    NoSuchSensor(u8, u8),
    /// Repository full or record ids exhausted
    OutOfSpace,
    /// Configuration file problem
    Config(String),
}

impl fmt::Display for EmuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmuError::InvalidParam(msg) => write!(f, "Invalid parameter: {}", msg),
            EmuError::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            EmuError::NoSuchMc(ipmb) => write!(f, "No MC at IPMB address 0x{:02x}", ipmb),
            EmuError::NoSuchSensor(lun, num) => {
                write!(f, "No sensor {} on LUN {}", num, lun)
            }
            EmuError::OutOfSpace => write!(f, "Out of space"),
            EmuError::Config(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EmuError {}

impl From<std::io::Error> for EmuError {
    fn from(error: std::io::Error) -> Self {
        EmuError::Config(error.to_string())
    }
}

impl From<serde_json::Error> for EmuError {
    fn from(error: serde_json::Error) -> Self {
        EmuError::Config(error.to_string())
    }
}

pub type EmuResult<T> = Result<T, EmuError>;
