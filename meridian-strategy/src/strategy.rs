//! The strategy plug-in contract, per spec.md §4.2.

use crate::{
    market_data::MarketData,
    parameter::{ParamValue, ParameterSpec},
    signal::TradingSignal,
};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Parameter(#[from] crate::parameter::ParameterError),
}

/// A strategy's externally observable runtime state, returned by
/// [`Strategy::get_state`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyState {
    pub enabled: bool,
    pub parameters: HashMap<String, ParamValue>,
}

/// Every strategy exposes this capability set (spec.md §4.2 "Plug-in
/// contract"). The duck-typed Python base class becomes a trait per
/// spec.md §9's redesign note; concrete strategies are values, not
/// reflection-loaded classes.
pub trait Strategy: Send + Sync {
    /// Analyzes one bar of market data, optionally returning a
    /// non-`Hold` trading signal. A `Hold` action (or no signal at all)
    /// means the strategy has nothing to do this tick.
    fn analyze(&self, market_data: &MarketData) -> Option<TradingSignal>;

    /// Indicator names this strategy requires to be present in
    /// `market_data.indicators` before `analyze` is invoked.
    fn required_indicators(&self) -> Vec<String>;

    /// The declared, schema-typed parameter set (name → spec).
    fn parameter_schema(&self) -> HashMap<String, ParameterSpec>;

    fn description(&self) -> &str;

    fn get_state(&self) -> StrategyState;

    fn enable(&mut self);

    fn disable(&mut self);

    fn is_enabled(&self) -> bool {
        self.get_state().enabled
    }

    /// Validates `parameters` against [`Strategy::parameter_schema`] and,
    /// if they pass, atomically replaces the current parameter mapping.
    fn update_parameters(
        &mut self,
        parameters: HashMap<String, ParamValue>,
    ) -> Result<(), StrategyError>;
}
