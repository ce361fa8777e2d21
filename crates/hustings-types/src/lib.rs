//! Shared type definitions for the Hustings campaign simulator.
//!
//! This crate is the single source of truth for all types used across the
//! Hustings workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the game dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (campaign phases, trend directions)
//! - [`structs`] -- Core entity structs (cycles, snapshots, results)
//! - [`events`] -- Scheduled event records and the tagged event payload

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CampaignPhase, TrendDirection};
pub use events::{EventPayload, ScheduledEvent};
pub use ids::{CandidateId, EventId, PlayerId};
pub use structs::{
    CampaignCycle, ElectionResult, ElectionSummary, EvLead, PollingAggregate, PollingSnapshot,
    StateCode, StateCodeError,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::CandidateId::export_all();
        let _ = crate::ids::EventId::export_all();

        // Enums
        let _ = crate::enums::CampaignPhase::export_all();
        let _ = crate::enums::TrendDirection::export_all();

        // Structs
        let _ = crate::structs::StateCode::export_all();
        let _ = crate::structs::CampaignCycle::export_all();
        let _ = crate::structs::PollingSnapshot::export_all();
        let _ = crate::structs::PollingAggregate::export_all();
        let _ = crate::structs::EvLead::export_all();
        let _ = crate::structs::ElectionSummary::export_all();
        let _ = crate::structs::ElectionResult::export_all();

        // Events
        let _ = crate::events::EventPayload::export_all();
        let _ = crate::events::ScheduledEvent::export_all();
    }
}
