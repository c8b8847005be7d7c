//! Strategy Loader (C5), per spec.md §4.1.
//!
//! Grounded on the activation/parameter-update lifecycle of
//! `examples/original_source/qb/engines/strategy_engine/strategy_loader.py`
//! (class/instance registry keyed by strategy name), reimplemented as a
//! typed handle registry instead of Python's dynamic `importlib` loading —
//! strategies are linked into the binary as [`Strategy`] trait objects
//! rather than discovered from a plug-in directory at runtime.

use crate::{
    parameter::{validate, ParamValue},
    strategy::{Strategy, StrategyError, StrategyState},
};
use meridian_instrument::Symbol;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StrategyLoaderError {
    #[error("strategy {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("strategy {0:?} is not registered")]
    NotFound(String),
    #[error(transparent)]
    Parameter(#[from] crate::parameter::ParameterError),
}

/// A registered strategy, addressable by name. Cloning a handle clones the
/// `Arc`, not the strategy; all clones observe the same enabled/parameter
/// state.
#[derive(Clone)]
pub struct StrategyHandle {
    name: String,
    inner: Arc<RwLock<Box<dyn Strategy>>>,
    /// Subscribed-symbol set assigned at activation; empty means "all
    /// symbols" (spec.md §4.2 "Activation").
    symbols: Arc<RwLock<HashSet<Symbol>>>,
}

impl StrategyHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` if this strategy should see `symbol` — an empty subscribed
    /// set means "all symbols".
    pub fn subscribes_to(&self, symbol: &Symbol) -> bool {
        let symbols = self.symbols.read();
        symbols.is_empty() || symbols.contains(symbol)
    }

    pub fn subscribed_symbols(&self) -> HashSet<Symbol> {
        self.symbols.read().clone()
    }

    pub fn set_symbols(&self, symbols: HashSet<Symbol>) {
        *self.symbols.write() = symbols;
    }

    pub fn analyze(
        &self,
        market_data: &crate::market_data::MarketData,
    ) -> Option<crate::signal::TradingSignal> {
        self.inner.read().analyze(market_data)
    }

    pub fn required_indicators(&self) -> Vec<String> {
        self.inner.read().required_indicators()
    }

    pub fn state(&self) -> StrategyState {
        self.inner.read().get_state()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.read().is_enabled()
    }
}

/// Owns the set of strategies wired into the engine and their activation
/// state, per spec.md §4.1 C5 ("activate_strategy", "deactivate_strategy",
/// "update_strategy_parameters").
#[derive(Default)]
pub struct StrategyLoader {
    strategies: RwLock<HashMap<String, StrategyHandle>>,
}

impl StrategyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy under `name`, enabled by default. Strategies
    /// are linked in at build time, so there is no discovery step — this
    /// stands in for the Python loader's `register_strategy`.
    pub fn register(
        &self,
        name: impl Into<String>,
        strategy: Box<dyn Strategy>,
    ) -> Result<StrategyHandle, StrategyLoaderError> {
        let name = name.into();
        let mut strategies = self.strategies.write();
        if strategies.contains_key(&name) {
            return Err(StrategyLoaderError::AlreadyRegistered(name));
        }
        let handle = StrategyHandle {
            name: name.clone(),
            inner: Arc::new(RwLock::new(strategy)),
            symbols: Arc::new(RwLock::new(HashSet::new())),
        };
        strategies.insert(name, handle.clone());
        Ok(handle)
    }

    pub fn activate_strategy(&self, name: &str) -> Result<(), StrategyLoaderError> {
        let strategies = self.strategies.read();
        let handle = strategies
            .get(name)
            .ok_or_else(|| StrategyLoaderError::NotFound(name.to_string()))?;
        handle.inner.write().enable();
        Ok(())
    }

    /// Activates `name` and assigns its subscribed-symbol set (empty = all
    /// symbols), per spec.md §4.2 `activate_strategy(name, parameters?,
    /// symbols?)`.
    pub fn activate_strategy_for_symbols(
        &self,
        name: &str,
        symbols: HashSet<Symbol>,
    ) -> Result<(), StrategyLoaderError> {
        let strategies = self.strategies.read();
        let handle = strategies
            .get(name)
            .ok_or_else(|| StrategyLoaderError::NotFound(name.to_string()))?;
        handle.inner.write().enable();
        handle.set_symbols(symbols);
        Ok(())
    }

    pub fn deactivate_strategy(&self, name: &str) -> Result<(), StrategyLoaderError> {
        let strategies = self.strategies.read();
        let handle = strategies
            .get(name)
            .ok_or_else(|| StrategyLoaderError::NotFound(name.to_string()))?;
        handle.inner.write().disable();
        handle.set_symbols(HashSet::new());
        Ok(())
    }

    pub fn update_strategy_parameters(
        &self,
        name: &str,
        parameters: HashMap<String, ParamValue>,
    ) -> Result<(), StrategyLoaderError> {
        let strategies = self.strategies.read();
        let handle = strategies
            .get(name)
            .ok_or_else(|| StrategyLoaderError::NotFound(name.to_string()))?;

        let mut strategy = handle.inner.write();
        let schema = strategy.parameter_schema();
        validate(&schema, &parameters).map_err(StrategyLoaderError::Parameter)?;
        strategy
            .update_parameters(parameters)
            .map_err(|e| match e {
                StrategyError::Parameter(p) => StrategyLoaderError::Parameter(p),
            })
    }

    pub fn handle(&self, name: &str) -> Option<StrategyHandle> {
        self.strategies.read().get(name).cloned()
    }

    /// Handles for every enabled strategy, in registration order is not
    /// guaranteed (hash map backed); callers that need dispatch order
    /// should sort by name.
    pub fn active_handles(&self) -> Vec<StrategyHandle> {
        self.strategies
            .read()
            .values()
            .filter(|h| h.is_enabled())
            .cloned()
            .collect()
    }

    pub fn all_handles(&self) -> Vec<StrategyHandle> {
        self.strategies.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moving_average::MovingAverageMomentum;

    #[test]
    fn register_then_activate_and_deactivate_round_trips() {
        let loader = StrategyLoader::new();
        loader
            .register("moving_average_momentum", Box::new(MovingAverageMomentum::default()))
            .unwrap();

        assert!(loader.handle("moving_average_momentum").unwrap().is_enabled());
        loader.deactivate_strategy("moving_average_momentum").unwrap();
        assert!(!loader.handle("moving_average_momentum").unwrap().is_enabled());
        loader.activate_strategy("moving_average_momentum").unwrap();
        assert!(loader.handle("moving_average_momentum").unwrap().is_enabled());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let loader = StrategyLoader::new();
        loader
            .register("moving_average_momentum", Box::new(MovingAverageMomentum::default()))
            .unwrap();
        let err = loader
            .register("moving_average_momentum", Box::new(MovingAverageMomentum::default()))
            .unwrap_err();
        assert!(matches!(err, StrategyLoaderError::AlreadyRegistered(_)));
    }

    #[test]
    fn unknown_strategy_operations_fail() {
        let loader = StrategyLoader::new();
        assert!(matches!(
            loader.activate_strategy("nope"),
            Err(StrategyLoaderError::NotFound(_))
        ));
    }

    #[test]
    fn empty_symbol_subscription_matches_everything_until_narrowed() {
        let loader = StrategyLoader::new();
        let handle = loader
            .register("moving_average_momentum", Box::new(MovingAverageMomentum::default()))
            .unwrap();
        assert!(handle.subscribes_to(&meridian_instrument::Symbol::new("005930")));

        loader
            .activate_strategy_for_symbols(
                "moving_average_momentum",
                [meridian_instrument::Symbol::new("005930")].into_iter().collect(),
            )
            .unwrap();

        assert!(handle.subscribes_to(&meridian_instrument::Symbol::new("005930")));
        assert!(!handle.subscribes_to(&meridian_instrument::Symbol::new("000660")));
    }

    #[test]
    fn parameter_update_rejects_out_of_range_value() {
        let loader = StrategyLoader::new();
        loader
            .register("moving_average_momentum", Box::new(MovingAverageMomentum::default()))
            .unwrap();
        let mut params = HashMap::new();
        params.insert("ma_period".to_string(), ParamValue::Integer(500));
        let err = loader
            .update_strategy_parameters("moving_average_momentum", params)
            .unwrap_err();
        assert!(matches!(err, StrategyLoaderError::Parameter(_)));
    }
}
