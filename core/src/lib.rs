//! # Postboard Core
//!
//! Core traits and types for the postboard client.
//!
//! The client follows a unidirectional data flow: the UI dispatches an
//! action, a reducer folds it into state, and effect descriptions returned by
//! reducers or produced by the effect coordinator are executed by the runtime.
//!
//! ## Core Concepts
//!
//! - **State**: the single list aggregate rendered by the UI
//! - **Action**: every input to the reducer (intents and their results)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of a side effect, executed by the runtime
//!
//! ## Example
//!
//! ```
//! use postboard_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Counter {
//!     count: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Bump,
//! }
//!
//! struct CounterReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = Counter;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut Counter,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         match action {
//!             CounterAction::Bump => state.count += 1,
//!         }
//!         SmallVec::new()
//!     }
//! }
//!
//! let mut state = Counter::default();
//! let effects = CounterReducer.reduce(&mut state, CounterAction::Bump, &());
//! assert_eq!(state.count, 1);
//! assert!(effects.is_empty());
//! ```

pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the state transition trait
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They are deterministic and never perform I/O themselves.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: Injected dependencies and settings
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates `state` in place and returns effect descriptions for the
        /// runtime to execute. Most transitions return no effects.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values, not execution. The runtime's `Store` executes them
/// and feeds any produced action back into the reducer.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future producing an optional follow-up action
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// If the future resolves to `Some`, the action is fed back into the store.
        Future(EffectFuture<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block as an `Effect::Future`
        #[must_use]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}
