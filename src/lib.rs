/*
 * SPDX-FileCopyrightText: 2025 UnionTech Software Technology Co., Ltd.
 *
 * SPDX-License-Identifier: GPL-2.0-or-later
 */
pub mod config;
pub mod emu;
pub mod error;
pub mod helper;
pub mod ipmi;
pub mod logging;
