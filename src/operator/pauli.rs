//! Sums of Pauli strings.
//!
//! A Pauli string maps every basis state to exactly one other basis state, so
//! a sum of `m` strings has at most `m` connected configurations per row.
//! Strings sharing the same set of flipped sites are merged, which collapses
//! all diagonal terms into a single entry.
//!
//! Builders are provided for the transverse-field Ising chain
//!
//!   H = -J Σ σᶻᵢ σᶻᵢ₊₁ - g Σ σˣᵢ - h Σ σᶻᵢ
//!
//! and for the usual observables measured along a trajectory.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{TdvpError, TdvpResult};
use crate::hilbert::{all_configs, SpinConfig};
use super::traits::LocalOperator;

/// Single-site Pauli matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pauli {
    X,
    Y,
    Z,
}

impl Pauli {
    fn flips(self) -> bool {
        !matches!(self, Pauli::Z)
    }

    // ⟨s|P|s'⟩ for the unique s' connected to a site holding spin `s`
    fn element(self, s: i8) -> Complex64 {
        match self {
            Pauli::X => Complex64::new(1.0, 0.0),
            Pauli::Y => Complex64::new(0.0, -(s as f64)),
            Pauli::Z => Complex64::new(s as f64, 0.0),
        }
    }
}

impl fmt::Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pauli::X => write!(f, "X"),
            Pauli::Y => write!(f, "Y"),
            Pauli::Z => write!(f, "Z"),
        }
    }
}

/// `coeff` times a product of Pauli matrices on distinct sites.
#[derive(Clone, Debug, PartialEq)]
pub struct PauliString {
    pub coeff: Complex64,
    ops: Vec<(usize, Pauli)>,
}

impl PauliString {
    /// Build a string; each site may appear at most once.
    pub fn new(coeff: Complex64, mut ops: Vec<(usize, Pauli)>) -> TdvpResult<Self> {
        ops.sort_by_key(|(site, _)| *site);
        if let Some(w) = ops.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(TdvpError::Config(format!(
                "pauli string acts twice on site {}", w[0].0
            )));
        }
        Ok(Self { coeff, ops })
    }

    /// Parse a whitespace-separated product such as `"X0 Z3"`.
    pub fn parse(coeff: Complex64, spec: &str) -> TdvpResult<Self> {
        let ops = spec.split_whitespace()
            .map(|tok| {
                let mut chars = tok.chars();
                let pauli = match chars.next() {
                    Some('X') | Some('x') => Pauli::X,
                    Some('Y') | Some('y') => Pauli::Y,
                    Some('Z') | Some('z') => Pauli::Z,
                    _ => return Err(TdvpError::Config(format!("bad pauli token '{}'", tok))),
                };
                let site = chars.as_str().parse::<usize>()
                    .map_err(|_| TdvpError::Config(format!("bad site index in '{}'", tok)))?;
                Ok((site, pauli))
            })
            .collect::<TdvpResult<Vec<_>>>()?;
        Self::new(coeff, ops)
    }

    pub fn ops(&self) -> &[(usize, Pauli)] {
        &self.ops
    }

    fn flip_sites(&self) -> Vec<usize> {
        self.ops.iter()
            .filter(|(_, p)| p.flips())
            .map(|(site, _)| *site)
            .collect()
    }

    fn max_site(&self) -> Option<usize> {
        self.ops.last().map(|(site, _)| *site)
    }

    /// ⟨s|P|s'⟩ for the configuration s' reached by flipping `flip_sites`.
    fn element(&self, config: &SpinConfig) -> Complex64 {
        self.ops.iter()
            .fold(self.coeff, |acc, (site, p)| acc * p.element(config.spin(*site)))
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:+.4}{:+.4}i)", self.coeff.re, self.coeff.im)?;
        for (site, p) in self.ops.iter() {
            write!(f, " {}{}", p, site)?;
        }
        Ok(())
    }
}

/// Sum of Pauli strings on an `n_sites` chain.
#[derive(Clone, Debug)]
pub struct PauliOperator {
    n_sites: usize,
    // terms grouped by the sites they flip
    groups: BTreeMap<Vec<usize>, Vec<PauliString>>,
}

impl PauliOperator {
    /// The zero operator.
    pub fn new(n_sites: usize) -> Self {
        Self { n_sites, groups: BTreeMap::new() }
    }

    /// Add a term, checking that it fits on the chain.
    pub fn add_term(&mut self, term: PauliString) -> TdvpResult<()> {
        if let Some(site) = term.max_site() {
            if site >= self.n_sites {
                return Err(TdvpError::SiteOutOfRange { site, n_sites: self.n_sites });
            }
        }
        self.groups.entry(term.flip_sites()).or_default().push(term);
        Ok(())
    }

    /// Builder form of [`PauliOperator::add_term`].
    pub fn with_term(mut self, term: PauliString) -> TdvpResult<Self> {
        self.add_term(term)?;
        Ok(self)
    }

    fn add_real(&mut self, coeff: f64, ops: Vec<(usize, Pauli)>) -> TdvpResult<()> {
        self.add_term(PauliString::new(Complex64::new(coeff, 0.0), ops)?)
    }

    /// H = -J Σ σᶻᵢ σᶻᵢ₊₁ - g Σ σˣᵢ - h Σ σᶻᵢ, optionally closed into a ring.
    pub fn transverse_field_ising(
        n_sites: usize,
        j: f64,
        g: f64,
        h: f64,
        periodic: bool,
    ) -> TdvpResult<Self> {
        let mut op = Self::new(n_sites);
        let n_bonds = if periodic && n_sites > 2 { n_sites } else { n_sites.saturating_sub(1) };
        for i in 0..n_bonds {
            op.add_real(-j, vec![(i, Pauli::Z), ((i + 1) % n_sites, Pauli::Z)])?;
        }
        for i in 0..n_sites {
            if g != 0.0 {
                op.add_real(-g, vec![(i, Pauli::X)])?;
            }
            if h != 0.0 {
                op.add_real(-h, vec![(i, Pauli::Z)])?;
            }
        }
        Ok(op)
    }

    /// -Σ σˣᵢ, whose ground state is the all-|+⟩ product state.
    pub fn transverse_field(n_sites: usize) -> TdvpResult<Self> {
        Self::single_site_sum(n_sites, Pauli::X, -1.0)
    }

    /// (1/n) Σ σˣᵢ
    pub fn x_polarization(n_sites: usize) -> TdvpResult<Self> {
        Self::single_site_sum(n_sites, Pauli::X, 1.0 / n_sites as f64)
    }

    /// (1/n) Σ σᶻᵢ
    pub fn z_polarization(n_sites: usize) -> TdvpResult<Self> {
        Self::single_site_sum(n_sites, Pauli::Z, 1.0 / n_sites as f64)
    }

    /// (1/n) Σ σᶻᵢ σᶻᵢ₊d on a ring.
    pub fn zz_correlation(n_sites: usize, distance: usize) -> TdvpResult<Self> {
        if distance == 0 || distance >= n_sites {
            return Err(TdvpError::Config(format!(
                "correlation distance must lie in 1..{}; got {}", n_sites, distance
            )));
        }
        let mut op = Self::new(n_sites);
        for i in 0..n_sites {
            op.add_real(
                1.0 / n_sites as f64,
                vec![(i, Pauli::Z), ((i + distance) % n_sites, Pauli::Z)],
            )?;
        }
        Ok(op)
    }

    fn single_site_sum(n_sites: usize, pauli: Pauli, coeff: f64) -> TdvpResult<Self> {
        let mut op = Self::new(n_sites);
        for i in 0..n_sites {
            op.add_real(coeff, vec![(i, pauli)])?;
        }
        Ok(op)
    }

    pub fn n_terms(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Dense matrix ⟨s|O|s'⟩ indexed by basis index; for small chains only.
    pub fn to_dense(&self) -> TdvpResult<DMatrix<Complex64>> {
        let configs = all_configs(self.n_sites)?;
        let dim = configs.len();
        let mut mat = DMatrix::zeros(dim, dim);
        for s in configs.iter() {
            let (conn, elems) = self.connected_elements(s);
            for (sp, e) in conn.iter().zip(elems) {
                mat[(s.to_index(), sp.to_index())] += e;
            }
        }
        Ok(mat)
    }
}

impl LocalOperator for PauliOperator {
    fn n_sites(&self) -> usize {
        self.n_sites
    }

    fn max_connections(&self) -> usize {
        self.groups.len()
    }

    fn connected_elements(&self, config: &SpinConfig) -> (Vec<SpinConfig>, Vec<Complex64>) {
        let mut connected = Vec::with_capacity(self.groups.len());
        let mut elements = Vec::with_capacity(self.groups.len());
        for (flips, terms) in self.groups.iter() {
            let element: Complex64 = terms.iter().map(|t| t.element(config)).sum();
            connected.push(config.flipped(flips));
            elements.push(element);
        }
        (connected, elements)
    }
}
