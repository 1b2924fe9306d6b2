/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */

//! Per-netfn command routing for one MC. The SEND_MSG envelope is peeled off
//! before this layer; everything here sees plain requests.

use crate::emu::mc::{self, EventMsg, McData, OEM0_CMD_GET_POWER, OEM0_CMD_SET_POWER};
use crate::emu::sdr;
use crate::emu::sel;
use crate::emu::sensor;
use crate::emu::fru;
use crate::ipmi::ipmi::*;
use log::debug;

pub(crate) fn dispatch_to_mc(
    mc: &mut McData,
    lun: u8,
    msg: &IpmiMsg,
    limit: usize,
    events: &mut Vec<EventMsg>,
) -> Vec<u8> {
    debug!(
        "mc 0x{:02x}: netfn 0x{:02x} cmd 0x{:02x} lun {} ({} data bytes)",
        mc.ipmb(),
        msg.netfn,
        msg.cmd,
        lun,
        msg.data.len()
    );
    match msg.netfn {
        IPMI_NETFN_APP => handle_app_netfn(mc, lun, msg),
        IPMI_NETFN_SE => handle_sensor_event_netfn(mc, lun, msg, limit, events),
        IPMI_NETFN_STORAGE => handle_storage_netfn(mc, lun, msg, limit),
        IPMI_NETFN_OEM0 => handle_oem0_netfn(mc, lun, msg, events),
        _ => vec![IPMI_CC_INV_CMD],
    }
}

fn handle_app_netfn(mc: &mut McData, _lun: u8, msg: &IpmiMsg) -> Vec<u8> {
    match msg.cmd {
        BMC_GET_DEVICE_ID => mc::handle_get_device_id(mc, msg),
        _ => vec![IPMI_CC_INV_CMD],
    }
}

fn handle_sensor_event_netfn(
    mc: &mut McData,
    lun: u8,
    msg: &IpmiMsg,
    limit: usize,
    events: &mut Vec<EventMsg>,
) -> Vec<u8> {
    match msg.cmd {
        sensor::IPMI_CMD_SET_EVENT_RECEIVER => mc::handle_set_event_receiver(mc, msg),
        sensor::IPMI_CMD_GET_EVENT_RECEIVER => mc::handle_get_event_receiver(mc, msg),
        sensor::IPMI_CMD_GET_DEVICE_SDR_INFO => sdr::handle_get_device_sdr_info(mc, lun, msg),
        sensor::IPMI_CMD_GET_DEVICE_SDR => sdr::handle_get_device_sdr(mc, lun, msg, limit),
        sensor::IPMI_CMD_RESERVE_DEVICE_SDR_REPO => {
            sdr::handle_reserve_device_sdr_repo(mc, lun, msg)
        }
        sensor::IPMI_CMD_SET_SENSOR_HYSTERESIS => {
            sensor::handle_set_sensor_hysteresis(mc, lun, msg)
        }
        sensor::IPMI_CMD_GET_SENSOR_HYSTERESIS => {
            sensor::handle_get_sensor_hysteresis(mc, lun, msg)
        }
        sensor::IPMI_CMD_SET_SENSOR_THRESHOLDS => {
            sensor::handle_set_sensor_thresholds(mc, lun, msg, events)
        }
        sensor::IPMI_CMD_GET_SENSOR_THRESHOLDS => {
            sensor::handle_get_sensor_thresholds(mc, lun, msg)
        }
        sensor::IPMI_CMD_SET_SENSOR_EVENT_ENABLE => {
            sensor::handle_set_sensor_event_enable(mc, lun, msg)
        }
        sensor::IPMI_CMD_GET_SENSOR_EVENT_ENABLE => {
            sensor::handle_get_sensor_event_enable(mc, lun, msg)
        }
        sensor::IPMI_CMD_GET_SENSOR_READING => sensor::handle_get_sensor_reading(mc, lun, msg),
        sensor::IPMI_CMD_SET_SENSOR_TYPE => sensor::handle_set_sensor_type(mc, lun, msg),
        sensor::IPMI_CMD_GET_SENSOR_TYPE => sensor::handle_get_sensor_type(mc, lun, msg),
        _ => vec![IPMI_CC_INV_CMD],
    }
}

fn handle_storage_netfn(mc: &mut McData, _lun: u8, msg: &IpmiMsg, limit: usize) -> Vec<u8> {
    match msg.cmd {
        fru::IPMI_CMD_GET_FRU_AREA_INFO => fru::handle_get_fru_area_info(mc, msg),
        fru::IPMI_CMD_READ_FRU_DATA => fru::handle_read_fru_data(mc, msg, limit),
        fru::IPMI_CMD_WRITE_FRU_DATA => fru::handle_write_fru_data(mc, msg),

        sdr::IPMI_CMD_GET_SDR_REPO_INFO => sdr::handle_get_sdr_repo_info(mc, msg),
        sdr::IPMI_CMD_GET_SDR_ALLOC_INFO => sdr::handle_get_sdr_alloc_info(mc, msg),
        sdr::IPMI_CMD_RESERVE_SDR_REPO => sdr::handle_reserve_sdr_repo(mc, msg),
        sdr::IPMI_CMD_GET_SDR => sdr::handle_get_sdr(mc, msg, limit),
        sdr::IPMI_CMD_ADD_SDR => sdr::handle_add_sdr(mc, msg),
        sdr::IPMI_CMD_PARTIAL_ADD_SDR => sdr::handle_partial_add_sdr(mc, msg),
        sdr::IPMI_CMD_DELETE_SDR => sdr::handle_delete_sdr(mc, msg),
        sdr::IPMI_CMD_CLEAR_SDR_REPO => sdr::handle_clear_sdr_repo(mc, msg),
        sdr::IPMI_CMD_GET_SDR_REPO_TIME => sdr::handle_get_sdr_repo_time(mc, msg),
        sdr::IPMI_CMD_SET_SDR_REPO_TIME => sdr::handle_set_sdr_repo_time(mc, msg),
        sdr::IPMI_CMD_ENTER_SDR_REPO_UPDATE => sdr::handle_enter_sdr_repo_update(mc, msg),
        sdr::IPMI_CMD_EXIT_SDR_REPO_UPDATE => sdr::handle_exit_sdr_repo_update(mc, msg),

        sel::IPMI_CMD_GET_SEL_INFO => sel::handle_get_sel_info(mc, msg),
        sel::IPMI_CMD_GET_SEL_ALLOC_INFO => sel::handle_get_sel_alloc_info(mc, msg),
        sel::IPMI_CMD_RESERVE_SEL => sel::handle_reserve_sel(mc, msg),
        sel::IPMI_CMD_GET_SEL_ENTRY => sel::handle_get_sel_entry(mc, msg),
        sel::IPMI_CMD_ADD_SEL_ENTRY => sel::handle_add_sel_entry(mc, msg),
        sel::IPMI_CMD_DELETE_SEL_ENTRY => sel::handle_delete_sel_entry(mc, msg),
        sel::IPMI_CMD_CLEAR_SEL => sel::handle_clear_sel(mc, msg),
        sel::IPMI_CMD_GET_SEL_TIME => sel::handle_get_sel_time(mc, msg),
        sel::IPMI_CMD_SET_SEL_TIME => sel::handle_set_sel_time(mc, msg),

        _ => vec![IPMI_CC_INV_CMD],
    }
}

fn handle_oem0_netfn(
    mc: &mut McData,
    _lun: u8,
    msg: &IpmiMsg,
    events: &mut Vec<EventMsg>,
) -> Vec<u8> {
    match msg.cmd {
        OEM0_CMD_SET_POWER => mc::handle_set_power(mc, msg, events),
        OEM0_CMD_GET_POWER => mc::handle_get_power(mc, msg),
        _ => vec![IPMI_CC_INV_CMD],
    }
}
