/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

//! Live sensor state: thresholds, hysteresis, event enables and the
//! deterministic threshold-crossing engine that feeds events into the
//! configured receiver's SEL.

use crate::emu::mc::{short_msg, EventMsg, EventSource, McData};
use crate::ipmi::ipmi::*;
use log::debug;

pub const IPMI_CMD_SET_EVENT_RECEIVER: u8 = 0x00;
pub const IPMI_CMD_GET_EVENT_RECEIVER: u8 = 0x01;
pub const IPMI_CMD_GET_DEVICE_SDR_INFO: u8 = 0x20;
pub const IPMI_CMD_GET_DEVICE_SDR: u8 = 0x21;
pub const IPMI_CMD_RESERVE_DEVICE_SDR_REPO: u8 = 0x22;
pub const IPMI_CMD_SET_SENSOR_HYSTERESIS: u8 = 0x24;
pub const IPMI_CMD_GET_SENSOR_HYSTERESIS: u8 = 0x25;
pub const IPMI_CMD_SET_SENSOR_THRESHOLDS: u8 = 0x26;
pub const IPMI_CMD_GET_SENSOR_THRESHOLDS: u8 = 0x27;
pub const IPMI_CMD_SET_SENSOR_EVENT_ENABLE: u8 = 0x28;
pub const IPMI_CMD_GET_SENSOR_EVENT_ENABLE: u8 = 0x29;
pub const IPMI_CMD_GET_SENSOR_READING: u8 = 0x2d;
pub const IPMI_CMD_SET_SENSOR_TYPE: u8 = 0x2e;
pub const IPMI_CMD_GET_SENSOR_TYPE: u8 = 0x2f;

pub const IPMI_HYSTERESIS_SUPPORT_NONE: u8 = 0;
pub const IPMI_HYSTERESIS_SUPPORT_READABLE: u8 = 1;
pub const IPMI_HYSTERESIS_SUPPORT_SETTABLE: u8 = 2;
pub const IPMI_HYSTERESIS_SUPPORT_FIXED: u8 = 3;

pub const IPMI_THRESHOLD_ACCESS_SUPPORT_NONE: u8 = 0;
pub const IPMI_THRESHOLD_ACCESS_SUPPORT_READABLE: u8 = 1;
pub const IPMI_THRESHOLD_ACCESS_SUPPORT_SETTABLE: u8 = 2;
pub const IPMI_THRESHOLD_ACCESS_SUPPORT_FIXED: u8 = 3;

pub const IPMI_EVENT_SUPPORT_PER_STATE: u8 = 0;
pub const IPMI_EVENT_SUPPORT_ENTIRE_SENSOR: u8 = 1;
pub const IPMI_EVENT_SUPPORT_GLOBAL_ENABLE: u8 = 2;
pub const IPMI_EVENT_SUPPORT_NONE: u8 = 3;

pub const IPMI_EVENT_READING_TYPE_THRESHOLD: u8 = 0x01;

pub const IPMI_ASSERTION: u8 = 0;
pub const IPMI_DEASSERTION: u8 = 1;

/// Event message revision for IPMI 1.5.
pub const EVENT_MSG_REVISION: u8 = 0x04;
pub const SEL_SYSTEM_EVENT_RECORD: u8 = 0x02;

pub const NUM_EVENT_BITS: usize = 15;
pub const NUM_THRESHOLDS: usize = 6;

/// Threshold slot order: lower nc, lower cr, lower nr, upper nc, upper cr,
/// upper nr.
#[derive(Debug, Default)]
pub struct Sensor {
    pub num: u8,
    pub lun: u8,
    pub sensor_type: u8,
    pub event_reading_code: u8,

    pub value: u8,
    pub scanning_enabled: bool,
    pub events_enabled: bool,

    pub hysteresis_support: u8,
    pub positive_hysteresis: u8,
    pub negative_hysteresis: u8,

    pub threshold_support: u8,
    pub threshold_supported: [bool; NUM_THRESHOLDS],
    pub thresholds: [u8; NUM_THRESHOLDS],

    pub event_support: u8,
    // First index: 0 assertion, 1 deassertion.
    pub event_supported: [[bool; NUM_EVENT_BITS]; 2],
    pub event_enabled: [[bool; NUM_EVENT_BITS]; 2],

    pub event_status: [bool; NUM_EVENT_BITS],
}

impl Sensor {
    pub fn new(lun: u8, num: u8, sensor_type: u8, event_reading_code: u8) -> Self {
        Self {
            num,
            lun,
            sensor_type,
            event_reading_code,
            ..Default::default()
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn do_event(
    src: &EventSource,
    sensor: &Sensor,
    gen_event: bool,
    direction: u8,
    byte1: u8,
    byte2: u8,
    byte3: u8,
    events: &mut Vec<EventMsg>,
) {
    if src.event_receiver == 0 || !sensor.events_enabled || !gen_event {
        return;
    }

    // Four leading timestamp bytes stay zero; the receiving SEL rewrites them.
    let mut data = [0u8; 13];
    data[4] = src.ipmb;
    data[5] = sensor.lun;
    data[6] = EVENT_MSG_REVISION;
    data[7] = sensor.sensor_type;
    data[8] = sensor.num;
    data[9] = (direction << 7) | sensor.event_reading_code;
    data[10] = byte1;
    data[11] = byte2;
    data[12] = byte3;

    debug!(
        "sensor {}/{} event dir={} data={:02x} {:02x} {:02x} -> 0x{:02x}",
        sensor.lun, sensor.num, direction, byte1, byte2, byte3, src.event_receiver
    );
    events.push(EventMsg {
        dest: src.event_receiver,
        record_type: SEL_SYSTEM_EVENT_RECORD,
        data,
    });
}

/// Flip one discrete event-state bit, emitting an event on a real change.
pub(crate) fn set_bit(
    src: &EventSource,
    sensor: &mut Sensor,
    bit: u8,
    value: bool,
    gen_event: bool,
    events: &mut Vec<EventMsg>,
) {
    let idx = usize::from(bit);
    if value == sensor.event_status[idx] {
        return;
    }
    sensor.event_status[idx] = value;
    if value && sensor.event_enabled[0][idx] {
        do_event(src, sensor, gen_event, IPMI_ASSERTION, bit, 0, 0, events);
    } else if !value && sensor.event_enabled[1][idx] {
        do_event(src, sensor, gen_event, IPMI_DEASSERTION, bit, 0, 0, events);
    }
}

/// Re-evaluate every supported threshold against the current value. Asserts
/// have no hysteresis band; deasserts back off by the configured hysteresis.
pub(crate) fn check_thresholds(
    src: &EventSource,
    sensor: &mut Sensor,
    gen_event: bool,
    events: &mut Vec<EventMsg>,
) {
    let mut bits_to_set = 0u8;
    let mut bits_to_clear = 0u8;

    let value = u16::from(sensor.value);
    for i in 0..3 {
        if !sensor.threshold_supported[i] {
            continue;
        }
        let threshold = u16::from(sensor.thresholds[i]);
        if value <= threshold {
            bits_to_set |= 1 << i;
        } else if value.saturating_sub(u16::from(sensor.negative_hysteresis)) > threshold {
            bits_to_clear |= 1 << i;
        }
    }
    for i in 3..NUM_THRESHOLDS {
        if !sensor.threshold_supported[i] {
            continue;
        }
        let threshold = u16::from(sensor.thresholds[i]);
        if value >= threshold {
            bits_to_set |= 1 << i;
        } else if value + u16::from(sensor.positive_hysteresis) < threshold {
            bits_to_clear |= 1 << i;
        }
    }

    for i in 0..NUM_THRESHOLDS {
        // Threshold event offsets start at 0x50; lower thresholds use the
        // even slots, upper thresholds the odd ones.
        let offset = if i < 3 {
            0x50 | (i as u8 * 2)
        } else {
            0x50 | ((i as u8 - 3) * 2 + 1)
        };
        if bits_to_set & (1 << i) != 0 && !sensor.event_status[i] {
            sensor.event_status[i] = true;
            if sensor.event_enabled[0][usize::from(offset & 0x0f)] {
                let (value, threshold) = (sensor.value, sensor.thresholds[i]);
                do_event(
                    src, sensor, gen_event, IPMI_ASSERTION, offset, value, threshold, events,
                );
            }
        } else if bits_to_clear & (1 << i) != 0 && sensor.event_status[i] {
            sensor.event_status[i] = false;
            if sensor.event_enabled[1][usize::from(offset & 0x0f)] {
                let (value, threshold) = (sensor.value, sensor.thresholds[i]);
                do_event(
                    src, sensor, gen_event, IPMI_DEASSERTION, offset, value, threshold, events,
                );
            }
        }
    }
}

fn lookup_sensor<'a>(mc: &'a mut McData, lun: u8, num: u8) -> Option<&'a mut Sensor> {
    mc.sensors[usize::from(lun & 0x3)].get_mut(&num)
}

pub(crate) fn handle_set_sensor_hysteresis(mc: &mut McData, lun: u8, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 4) {
        return rsp;
    }
    let d = msg.data;
    let sensor = match lookup_sensor(mc, lun, d[0]) {
        Some(sensor) => sensor,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };
    if sensor.hysteresis_support != IPMI_HYSTERESIS_SUPPORT_SETTABLE {
        return vec![IPMI_CC_INV_CMD];
    }

    sensor.positive_hysteresis = d[2];
    sensor.negative_hysteresis = d[3];
    vec![0]
}

pub(crate) fn handle_get_sensor_hysteresis(mc: &mut McData, lun: u8, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 1) {
        return rsp;
    }
    let sensor = match lookup_sensor(mc, lun, msg.data[0]) {
        Some(sensor) => sensor,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };
    if sensor.hysteresis_support != IPMI_HYSTERESIS_SUPPORT_SETTABLE
        && sensor.hysteresis_support != IPMI_HYSTERESIS_SUPPORT_READABLE
    {
        return vec![IPMI_CC_INV_CMD];
    }

    vec![0, sensor.positive_hysteresis, sensor.negative_hysteresis]
}

pub(crate) fn handle_set_sensor_thresholds(
    mc: &mut McData,
    lun: u8,
    msg: &IpmiMsg,
    events: &mut Vec<EventMsg>,
) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 8) {
        return rsp;
    }
    let d = msg.data;
    let src = mc.event_source();
    let sensor = match lookup_sensor(mc, lun, d[0]) {
        Some(sensor) => sensor,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };
    if sensor.event_reading_code != IPMI_EVENT_READING_TYPE_THRESHOLD
        || sensor.threshold_support != IPMI_THRESHOLD_ACCESS_SUPPORT_SETTABLE
    {
        return vec![IPMI_CC_INV_CMD];
    }

    for i in 0..NUM_THRESHOLDS {
        if d[1] & (1 << i) != 0 && !sensor.threshold_supported[i] {
            return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
        }
    }
    for i in 0..NUM_THRESHOLDS {
        if d[1] & (1 << i) != 0 {
            sensor.thresholds[i] = d[i + 2];
        }
    }

    check_thresholds(&src, sensor, true, events);
    vec![0]
}

pub(crate) fn handle_get_sensor_thresholds(mc: &mut McData, lun: u8, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 1) {
        return rsp;
    }
    let sensor = match lookup_sensor(mc, lun, msg.data[0]) {
        Some(sensor) => sensor,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };
    if sensor.event_reading_code != IPMI_EVENT_READING_TYPE_THRESHOLD
        || (sensor.threshold_support != IPMI_THRESHOLD_ACCESS_SUPPORT_SETTABLE
            && sensor.threshold_support != IPMI_THRESHOLD_ACCESS_SUPPORT_READABLE)
    {
        return vec![IPMI_CC_INV_CMD];
    }

    let mut rsp = vec![0u8; 8];
    for i in 0..NUM_THRESHOLDS {
        if sensor.threshold_supported[i] {
            rsp[1] |= 1 << i;
            rsp[2 + i] = sensor.thresholds[i];
        }
    }
    rsp
}

pub(crate) fn handle_set_sensor_event_enable(mc: &mut McData, lun: u8, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 2) {
        return rsp;
    }
    let d = msg.data;
    let sensor = match lookup_sensor(mc, lun, d[0]) {
        Some(sensor) => sensor,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };
    if sensor.event_support == IPMI_EVENT_SUPPORT_NONE
        || sensor.event_support == IPMI_EVENT_SUPPORT_GLOBAL_ENABLE
    {
        return vec![IPMI_CC_INV_CMD];
    }

    let op = (d[1] >> 4) & 0x3;
    if sensor.event_support == IPMI_EVENT_SUPPORT_ENTIRE_SENSOR && op != 0 {
        return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
    }
    if op == 3 {
        return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ];
    }

    sensor.events_enabled = d[1] & 0x80 != 0;
    sensor.scanning_enabled = d[1] & 0x40 != 0;

    if op == 0 {
        return vec![0];
    }
    let enable = op == 1;

    // Assertion mask bytes 2-3, deassertion bytes 4-5; both optional tails.
    for (dir, base) in [(0usize, 2usize), (1, 4)] {
        let mut e = 0usize;
        for i in base..base + 2 {
            if d.len() <= i {
                break;
            }
            for j in 0..8 {
                if e < NUM_EVENT_BITS && (d[i] >> j) & 1 != 0 {
                    sensor.event_enabled[dir][e] = enable;
                }
                e += 1;
            }
        }
    }

    vec![0]
}

pub(crate) fn handle_get_sensor_event_enable(mc: &mut McData, lun: u8, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 1) {
        return rsp;
    }
    let sensor = match lookup_sensor(mc, lun, msg.data[0]) {
        Some(sensor) => sensor,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };
    if sensor.event_support == IPMI_EVENT_SUPPORT_NONE
        || sensor.event_support == IPMI_EVENT_SUPPORT_GLOBAL_ENABLE
    {
        return vec![IPMI_CC_INV_CMD];
    }

    let mut rsp = vec![
        0,
        (u8::from(sensor.events_enabled) << 7) | (u8::from(sensor.scanning_enabled) << 6),
    ];
    if sensor.event_support == IPMI_EVENT_SUPPORT_ENTIRE_SENSOR {
        return rsp;
    }

    for dir in 0..2 {
        for chunk in 0..2 {
            let mut byte = 0u8;
            for j in 0..8 {
                let e = chunk * 8 + j;
                if e < NUM_EVENT_BITS && sensor.event_enabled[dir][e] {
                    byte |= 1 << j;
                }
            }
            rsp.push(byte);
        }
    }
    rsp
}

pub(crate) fn handle_get_sensor_reading(mc: &mut McData, lun: u8, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 1) {
        return rsp;
    }
    let sensor = match lookup_sensor(mc, lun, msg.data[0]) {
        Some(sensor) => sensor,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };

    let mut rsp = vec![
        0,
        sensor.value,
        (u8::from(sensor.events_enabled) << 7) | (u8::from(sensor.scanning_enabled) << 6),
    ];
    for chunk in 0..2 {
        let mut byte = 0u8;
        for j in 0..8 {
            let e = chunk * 8 + j;
            if e < NUM_EVENT_BITS && sensor.event_status[e] {
                byte |= 1 << j;
            }
        }
        rsp.push(byte);
    }
    rsp
}

pub(crate) fn handle_set_sensor_type(_mc: &mut McData, _lun: u8, _msg: &IpmiMsg) -> Vec<u8> {
    vec![IPMI_CC_INV_CMD]
}

pub(crate) fn handle_get_sensor_type(mc: &mut McData, lun: u8, msg: &IpmiMsg) -> Vec<u8> {
    if let Some(rsp) = short_msg(msg, 1) {
        return rsp;
    }
    let sensor = match lookup_sensor(mc, lun, msg.data[0]) {
        Some(sensor) => sensor,
        None => return vec![IPMI_CC_INV_DATA_FIELD_IN_REQ],
    };
    vec![0, sensor.sensor_type, sensor.event_reading_code]
}
