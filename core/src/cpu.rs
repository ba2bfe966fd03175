use crate::Bus;

/// A CPU that executes one instruction at a time against a `Bus`.
///
/// The type parameter `B` is the bus type this CPU operates on. There is no
/// cycle return value: timing is explicitly not modeled, so `step` only
/// reports whether the core is still running or has entered a wait state.
pub trait Cpu<B: Bus> {
    /// Execute one instruction, first consulting interrupt latches.
    fn step(&mut self, bus: &mut B);

    /// Reset the CPU: load PC from the reset vector and clear wait states.
    fn reset(&mut self, bus: &mut B);

    /// Get the current program counter.
    fn pc(&self) -> u16;

    /// True while SYNC/CWAI has suspended instruction execution.
    fn is_waiting(&self) -> bool;
}
