//! Triangle model and cycle enumeration.
//!
//! A triangle is an ordered three-leg conversion cycle that starts and
//! ends in the quote asset. Two construction modes exist:
//!
//!   * `build_triangles` — from a configured list of base assets
//!   * `discover_triangles` — from the venue's full market map
//!
//! Enumeration is a one-shot startup cost; triangles are frozen after
//! construction and identified by their route signature.

use std::collections::{BTreeMap, HashSet};

/// One directed conversion `from_asset -> to_asset` over `symbol`.
/// `{from_asset, to_asset}` always equals the unordered `{base, quote}`
/// pair of `symbol`; the direction selects bid vs. ask at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, std::hash::Hash)]
pub struct TriangleLeg {
    pub symbol: String,
    pub from_asset: String,
    pub to_asset: String,
}

impl TriangleLeg {
    pub fn new(
        symbol: impl Into<String>,
        from_asset: impl Into<String>,
        to_asset: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            from_asset: from_asset.into(),
            to_asset: to_asset.into(),
        }
    }
}

/// An ordered three-leg cycle. Frozen after construction; equality is by
/// leg tuple.
#[derive(Debug, Clone, PartialEq, Eq, std::hash::Hash)]
pub struct Triangle {
    pub legs: [TriangleLeg; 3],
}

impl Triangle {
    pub fn new(legs: [TriangleLeg; 3]) -> Self {
        Self { legs }
    }

    pub fn symbols(&self) -> [&str; 3] {
        [
            &self.legs[0].symbol,
            &self.legs[1].symbol,
            &self.legs[2].symbol,
        ]
    }

    /// Canonical `"symbol:from->to|..."` signature. Used to suppress
    /// duplicate discovery paths and as the persisted triangle identity.
    pub fn signature(&self) -> String {
        self.legs
            .iter()
            .map(|leg| format!("{}:{}->{}", leg.symbol, leg.from_asset, leg.to_asset))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Human-readable route for log lines.
    pub fn route(&self) -> String {
        self.symbols().join(" -> ")
    }
}

/// A tradable market listing, as reported by the venue's metadata.
#[derive(Debug, Clone)]
pub struct Listing {
    pub symbol: String,
    pub base: String,
    pub quote: String,
}

/// Enumerate triangles from configured base assets: for every ordered pair
/// `(a, b)` with `a != b`, the cycle `quote -> a -> b -> quote` over the
/// symbols `a/quote`, `b/a`, `quote/b`.
///
/// The third leg keeps the `quote/b` spelling; when the venue's canonical
/// symbol for that pair is `b/quote` the evaluation-time book lookup
/// misses and the triangle is simply non-viable.
pub fn build_triangles(quote: &str, bases: &[String]) -> Vec<Triangle> {
    let mut triangles = Vec::new();

    for a in bases {
        for b in bases {
            if a == b {
                continue;
            }
            triangles.push(Triangle::new([
                TriangleLeg::new(format!("{a}/{quote}"), quote, a.as_str()),
                TriangleLeg::new(format!("{b}/{a}"), a.as_str(), b.as_str()),
                TriangleLeg::new(format!("{quote}/{b}"), b.as_str(), quote),
            ]));
        }
    }

    triangles
}

/// Enumerate every three-leg cycle over the venue's traded-pair graph that
/// starts and ends at `quote`, visits no asset twice except the terminal
/// return, and uses three pairwise-distinct symbols. Duplicate paths are
/// suppressed by route signature; adjacency is ordered so the result is
/// deterministic for a given market map.
pub fn discover_triangles(quote: &str, listings: &[Listing]) -> Vec<Triangle> {
    let mut adjacency: BTreeMap<&str, Vec<TriangleLeg>> = BTreeMap::new();

    for listing in listings {
        if listing.base.is_empty() || listing.quote.is_empty() || listing.symbol.is_empty() {
            continue;
        }
        adjacency
            .entry(listing.base.as_str())
            .or_default()
            .push(TriangleLeg::new(
                listing.symbol.as_str(),
                listing.base.as_str(),
                listing.quote.as_str(),
            ));
        adjacency
            .entry(listing.quote.as_str())
            .or_default()
            .push(TriangleLeg::new(
                listing.symbol.as_str(),
                listing.quote.as_str(),
                listing.base.as_str(),
            ));
    }

    let empty = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut triangles = Vec::new();

    for leg1 in adjacency.get(quote).unwrap_or(&empty) {
        let asset1 = leg1.to_asset.as_str();
        if asset1 == quote {
            continue;
        }

        for leg2 in adjacency.get(asset1).unwrap_or(&empty) {
            let asset2 = leg2.to_asset.as_str();
            if asset2 == quote || asset2 == asset1 {
                continue;
            }

            for leg3 in adjacency.get(asset2).unwrap_or(&empty) {
                if leg3.to_asset != quote {
                    continue;
                }
                if leg3.symbol == leg1.symbol || leg3.symbol == leg2.symbol {
                    continue;
                }

                let triangle = Triangle::new([leg1.clone(), leg2.clone(), leg3.clone()]);
                if seen.insert(triangle.signature()) {
                    triangles.push(triangle);
                }
            }
        }
    }

    triangles
}
