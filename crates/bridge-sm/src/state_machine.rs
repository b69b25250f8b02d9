//! The interface every protocol state machine implements.

/// A deterministic, effect-free state machine driving one bridge operation.
///
/// Implementations hold their configuration and current state, transition on
/// events, and expose the next required action as a duty derived purely from
/// the current state. The duty for a state is stable: asking twice without an
/// intervening event returns the same answer.
pub trait StateMachine {
    /// The type of events this state machine can process.
    type Event;

    /// The type of duties this state machine can emit.
    type Duty;

    /// The error type returned when event processing fails.
    type Error;

    /// Transitions on `event`, or rejects it if it does not apply to the
    /// current state.
    fn process_event(&mut self, event: Self::Event) -> Result<(), Self::Error>;

    /// The next action the executor must take, or `None` once the operation
    /// is terminal.
    fn pending_duty(&self) -> Option<Self::Duty>;

    /// Whether the operation has run to completion.
    fn is_terminal(&self) -> bool;

    /// A short label of the current state, for logs and persistence rows.
    fn step(&self) -> &'static str;
}
