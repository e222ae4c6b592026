use crate::SimulationBounds;

/// Change notifications published by the simulation coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimulationEvent {
    /// Agent buffers were reallocated. Any previously obtained agent buffer
    /// handle is invalid.
    AgentCountChanged { previous: u32, current: u32 },
    /// The simulation volume moved or resized. No buffers were touched.
    BoundsChanged(SimulationBounds),
}
