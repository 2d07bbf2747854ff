// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Settable counter metrics
//!
//! The service reports absolute cumulative counts (documents written, revs
//! checked, ...), not deltas. Prometheus rate()/increase() only work well
//! against counter-typed samples, but the `prometheus` crate's `Counter`
//! can only be incremented. `SettableCounterVec` bridges the two: it keeps
//! the counter wire contract while letting the monitors `set` each series
//! to the value the service reported, including a *lower* value after a
//! remote reset.
//!
//! The minimal write path is reimplemented here: descriptor registration,
//! label-pair construction in name-sorted order, and counter-typed
//! serialization via a custom `Collector`.

use prometheus::core::{Collector, Desc};
use prometheus::proto;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A labelled family of counter-typed metrics whose values are set to
/// externally-computed absolute values rather than incremented locally.
///
/// Series are addressed by their exact label-value combination and live
/// for the process lifetime; cardinality is bounded by concurrently
/// active jobs, not request volume.
#[derive(Clone, Debug)]
pub struct SettableCounterVec {
    desc: Desc,
    values: Arc<RwLock<BTreeMap<Vec<String>, f64>>>,
}

/// Handle to a single series of a [`SettableCounterVec`].
#[derive(Clone, Debug)]
pub struct SettableCounter {
    values: Arc<RwLock<BTreeMap<Vec<String>, f64>>>,
    key: Vec<String>,
}

impl SettableCounterVec {
    /// Creates a new family with the given variable label names.
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> prometheus::Result<Self> {
        let desc = Desc::new(
            name.to_string(),
            help.to_string(),
            label_names.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?;
        Ok(Self {
            desc,
            values: Arc::new(RwLock::new(BTreeMap::new())),
        })
    }

    /// Returns the series for the given label values, creating it at zero
    /// on first use.
    ///
    /// # Panics
    /// Panics if the number of values differs from the number of label
    /// names the family was created with. That is a programmer error, not
    /// a runtime condition.
    pub fn with_label_values(&self, label_values: &[&str]) -> SettableCounter {
        assert_eq!(
            label_values.len(),
            self.desc.variable_labels.len(),
            "metric {} expects {} label value(s), got {}",
            self.desc.fq_name,
            self.desc.variable_labels.len(),
            label_values.len()
        );
        let key: Vec<String> = label_values.iter().map(|v| v.to_string()).collect();
        self.write_values().entry(key.clone()).or_insert(0.0);
        SettableCounter {
            values: Arc::clone(&self.values),
            key,
        }
    }

    fn read_values(&self) -> RwLockReadGuard<'_, BTreeMap<Vec<String>, f64>> {
        self.values.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_values(&self) -> RwLockWriteGuard<'_, BTreeMap<Vec<String>, f64>> {
        self.values.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettableCounter {
    /// Replaces the series value unconditionally. No accumulation and no
    /// decrease protection: the service may legitimately report a lower
    /// value after a remote reset.
    pub fn set(&self, v: f64) {
        let mut values = self
            .values
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(self.key.clone(), v);
    }

    /// Current value of the series.
    pub fn get(&self) -> f64 {
        let values = self
            .values
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        values.get(&self.key).copied().unwrap_or(0.0)
    }
}

impl Collector for SettableCounterVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let values = self.read_values();

        let mut family = proto::MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(proto::MetricType::COUNTER);

        // BTreeMap iteration keeps series order stable across scrapes.
        for (label_values, value) in values.iter() {
            let mut pairs: Vec<proto::LabelPair> = self
                .desc
                .variable_labels
                .iter()
                .zip(label_values.iter())
                .map(|(name, value)| {
                    let mut pair = proto::LabelPair::default();
                    pair.set_name(name.clone());
                    pair.set_value(value.clone());
                    pair
                })
                .collect();
            // Label pairs serialize in name-sorted order so scrape output
            // is deterministic.
            pairs.sort_by(|a, b| a.get_name().cmp(b.get_name()));

            let mut counter = proto::Counter::default();
            counter.set_value(*value);

            let mut metric = proto::Metric::default();
            for pair in pairs {
                metric.mut_label().push(pair);
            }
            metric.set_counter(counter);
            family.mut_metric().push(metric);
        }

        vec![family]
    }
}
