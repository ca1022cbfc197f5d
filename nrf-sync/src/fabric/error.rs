/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fabric configuration errors.
//!
//! Every variant is raised while the fabric is being built, before anything
//! runs.  Once a binding is enabled it cannot fail.

use thiserror::Error;

use crate::handle::{EventHandle, NodeId, TaskHandle};

use super::{Slot, FABRIC_SLOTS};

/// Why a handle in a binding does not resolve to a live peripheral resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unresolved {
    /// The handle was produced by another node's peripheral.
    #[error("handle belongs to another node (fabric is on {expected})")]
    ForeignNode { expected: NodeId },

    #[error("peripheral is not configured")]
    NotConfigured,

    /// The channel / rung / button index does not exist or is not set up.
    #[error("no such channel or rung")]
    NoSuchResource,

    #[error("radio is configured for the other role")]
    WrongRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FabricError {
    #[error("all {FABRIC_SLOTS} fabric slots are bound")]
    SlotsExhausted,

    #[error("{slot}: event {handle} does not resolve: {reason}")]
    UnresolvedEvent {
        slot: Slot,
        handle: EventHandle,
        reason: Unresolved,
    },

    #[error("{slot}: task {handle} does not resolve: {reason}")]
    UnresolvedTask {
        slot: Slot,
        handle: TaskHandle,
        reason: Unresolved,
    },

    #[error("{0} was never bound")]
    UnknownSlot(Slot),

    #[error("fabric built for {fabric} cannot drive {node}")]
    NodeMismatch { fabric: NodeId, node: NodeId },
}
