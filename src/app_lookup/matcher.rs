// SPDX-License-Identifier: GPL-3.0-only
use serde::Serialize;
use serde::ser::Serializer;
use std::collections::{HashMap, HashSet};
use strsim::sorensen_dice;

use crate::app_lookup::applist::SteamApp;

/// Closest Steam app for a name without an exact match
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMatch {
    pub app_id: u32,
    pub similarity: f64,
    pub steam_name: String,
}

/// Game names paired with their match, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct NamedMatches<T>(pub Vec<(String, T)>);

impl<T> Default for NamedMatches<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> NamedMatches<T> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, T)> {
        self.0.iter()
    }
}

/// Serialized as a JSON object keyed by game name
impl<T: Serialize> Serialize for NamedMatches<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, value)| (name, value)))
    }
}

#[derive(Debug, Default)]
pub struct MatchResult {
    pub full: NamedMatches<u32>,
    pub best: NamedMatches<BestMatch>,
}

/// Non-empty, distinct names from a newline separated list
pub fn read_names(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect()
}

/// Exact name matches first; the rest get the most similar app name.
pub fn match_names(names: &[String], apps: &[SteamApp]) -> MatchResult {
    let mut exact: HashMap<&str, u32> = HashMap::with_capacity(apps.len());
    for app in apps {
        exact.entry(app.name.as_str()).or_insert(app.appid);
    }

    let mut result = MatchResult::default();
    let mut remaining = Vec::new();
    for name in names {
        match exact.get(name.as_str()) {
            Some(&app_id) => result.full.0.push((name.clone(), app_id)),
            None => remaining.push(name),
        }
    }

    for name in remaining {
        if let Some(best) = best_match(name, apps) {
            result.best.0.push((name.clone(), best));
        }
    }

    result
}

/// Highest Sørensen-Dice score; the first app wins ties
fn best_match(name: &str, apps: &[SteamApp]) -> Option<BestMatch> {
    let mut best: Option<(&SteamApp, f64)> = None;
    for app in apps {
        let similarity = sorensen_dice(name, &app.name);
        if best.is_none_or(|(_, top)| similarity > top) {
            best = Some((app, similarity));
        }
    }

    best.map(|(app, similarity)| BestMatch {
        app_id: app.appid,
        similarity,
        steam_name: app.name.clone(),
    })
}
