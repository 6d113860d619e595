//! Rule AST data structures.
//!
//! This module defines the abstract syntax tree for entry conditions:
//! - `Operand`: What can be compared (price fields, constants, indicators)
//! - `IndicatorRef`: Reference to an indicator with a specific field
//! - `IndicatorField`: Which field of a multi-value indicator to use
//! - `Rule`: The rule AST with comparison, composite, and candle-pattern variants

use crate::domain::indicator::IndicatorType;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volume,
    Constant(f64),
    Indicator(IndicatorRef),
    /// The inner operand one bar earlier.
    Previous(Box<Operand>),
    Scaled {
        operand: Box<Operand>,
        factor: f64,
    },
}

impl Operand {
    pub fn value(indicator_type: IndicatorType) -> Self {
        Operand::Indicator(IndicatorRef {
            indicator_type,
            field: IndicatorField::Value,
        })
    }

    pub fn field(indicator_type: IndicatorType, field: IndicatorField) -> Self {
        Operand::Indicator(IndicatorRef {
            indicator_type,
            field,
        })
    }

    pub fn previous(self) -> Self {
        Operand::Previous(Box::new(self))
    }

    pub fn scaled(self, factor: f64) -> Self {
        Operand::Scaled {
            operand: Box::new(self),
            factor,
        }
    }

    /// Number of bars this operand looks back.
    pub fn lookback(&self) -> usize {
        match self {
            Operand::Previous(inner) => 1 + inner.lookback(),
            Operand::Scaled { operand, .. } => operand.lookback(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
    Adx,
    PlusDi,
    MinusDi,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    /// Child rule held on at least one of the last `count` bars (current included).
    AnyOf {
        rule: Box<Rule>,
        count: usize,
    },
    /// Bullish candle whose body is larger than the most recent earlier bearish body.
    BullishEngulfsLastBearish,
}

impl Rule {
    /// Bars of history the rule needs beyond the current one.
    pub fn lookback(&self) -> usize {
        match self {
            Rule::CrossAbove { left, right } | Rule::CrossBelow { left, right } => {
                1 + left.lookback().max(right.lookback())
            }
            Rule::Above { left, right } | Rule::Below { left, right } => {
                left.lookback().max(right.lookback())
            }
            Rule::And(rules) | Rule::Or(rules) => {
                rules.iter().map(Rule::lookback).max().unwrap_or(0)
            }
            Rule::AnyOf { rule, count } => count.saturating_sub(1) + rule.lookback(),
            Rule::BullishEngulfsLastBearish => 0,
        }
    }

    /// First comparison whose two sides are the same operand.
    ///
    /// Such a comparison is constant (`>` and crosses never fire), which
    /// usually means two configured windows collapsed to the same value.
    pub fn self_comparison(&self) -> Option<&Operand> {
        match self {
            Rule::CrossAbove { left, right }
            | Rule::CrossBelow { left, right }
            | Rule::Above { left, right }
            | Rule::Below { left, right } => (left == right).then_some(left),
            Rule::And(rules) | Rule::Or(rules) => rules.iter().find_map(Rule::self_comparison),
            Rule::AnyOf { rule, .. } => rule.self_comparison(),
            Rule::BullishEngulfsLastBearish => None,
        }
    }
}

/// Collect every indicator a rule references, sorted and de-duplicated.
pub fn extract_indicators(rule: &Rule) -> Vec<IndicatorType> {
    let mut set = BTreeSet::new();
    collect_rule(rule, &mut set);
    set.into_iter().collect()
}

fn collect_rule(rule: &Rule, set: &mut BTreeSet<IndicatorType>) {
    match rule {
        Rule::CrossAbove { left, right }
        | Rule::CrossBelow { left, right }
        | Rule::Above { left, right }
        | Rule::Below { left, right } => {
            collect_operand(left, set);
            collect_operand(right, set);
        }
        Rule::And(rules) | Rule::Or(rules) => {
            for r in rules {
                collect_rule(r, set);
            }
        }
        Rule::AnyOf { rule, .. } => collect_rule(rule, set),
        Rule::BullishEngulfsLastBearish => {}
    }
}

fn collect_operand(operand: &Operand, set: &mut BTreeSet<IndicatorType>) {
    match operand {
        Operand::Indicator(r) => {
            set.insert(r.indicator_type.clone());
        }
        Operand::Previous(inner) => collect_operand(inner, set),
        Operand::Scaled { operand, .. } => collect_operand(operand, set),
        _ => {}
    }
}

impl fmt::Display for IndicatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorField::Value => "",
            IndicatorField::MacdLine => ".line",
            IndicatorField::MacdSignal => ".signal",
            IndicatorField::MacdHistogram => ".histogram",
            IndicatorField::BollingerUpper => ".upper",
            IndicatorField::BollingerMiddle => ".middle",
            IndicatorField::BollingerLower => ".lower",
            IndicatorField::Adx => ".adx",
            IndicatorField::PlusDi => ".plus_di",
            IndicatorField::MinusDi => ".minus_di",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Open => write!(f, "open"),
            Operand::High => write!(f, "high"),
            Operand::Low => write!(f, "low"),
            Operand::Close => write!(f, "close"),
            Operand::Volume => write!(f, "volume"),
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Indicator(r) => write!(f, "{}{}", r.indicator_type, r.field),
            Operand::Previous(inner) => write!(f, "PREV({})", inner),
            Operand::Scaled { operand, factor } => write!(f, "{} * {}", factor, operand),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({}, {})", left, right),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({}, {})", left, right),
            Rule::Above { left, right } => write!(f, "{} > {}", left, right),
            Rule::Below { left, right } => write!(f, "{} < {}", left, right),
            Rule::And(rules) => {
                let parts: Vec<String> = rules.iter().map(|r| r.to_string()).collect();
                write!(f, "AND({})", parts.join(", "))
            }
            Rule::Or(rules) => {
                let parts: Vec<String> = rules.iter().map(|r| r.to_string()).collect();
                write!(f, "OR({})", parts.join(", "))
            }
            Rule::AnyOf { rule, count } => write!(f, "ANY_OF({}, {})", rule, count),
            Rule::BullishEngulfsLastBearish => write!(f, "BULLISH_ENGULFS_LAST_BEARISH"),
        }
    }
}
