// Thread tree construction.
//
// Flat records -> indexed forest:
// 1. Index records by id (first occurrence wins)
// 2. Attach each record to its parent in input order; unknown parents
//    promote the record to a root
// 3. Break parent cycles: anything not reachable from a root sits on or
//    under a cycle; the earliest cycle member becomes a root
// 4. Subtree weights bottom-up, root sectors proportional to weight
//
// Nodes are stored in input order, so a node's index is its record's index.

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, TAU};

use log::{debug, warn};

use crate::record::{LayoutDescriptor, MessageRecord};
use super::LayoutWarning;

/// Replay vs. search, decided once per node.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Regenerate exactly from a stored descriptor.
    Replayed(LayoutDescriptor),
    /// No usable descriptor; search for a collision-free variation.
    Fresh,
}

#[derive(Debug, Clone)]
pub struct TreeNode<'a> {
    pub record: &'a MessageRecord,
    pub parent: Option<usize>,
    /// Input order.
    pub children: Vec<usize>,
    /// Node count of the subtree rooted here.
    pub weight: usize,
    pub placement: Placement,
}

/// Root with its share of the full turn.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RootSector {
    pub node: usize,
    /// Sector midpoint (radians); roots start here unless replayed.
    pub start_angle: f64,
    pub sector: f64,
}

#[derive(Debug, Clone)]
pub struct ThreadTree<'a> {
    pub nodes: Vec<TreeNode<'a>>,
    /// Input order.
    pub roots: Vec<usize>,
}

impl<'a> ThreadTree<'a> {
    pub fn build(records: &'a [MessageRecord]) -> (Self, Vec<LayoutWarning>) {
        let mut warnings = Vec::new();

        let mut index: HashMap<i64, usize> = HashMap::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            if index.contains_key(&rec.id) {
                warn!("duplicate message id {}", rec.id);
                warnings.push(LayoutWarning::DuplicateId { id: rec.id });
            } else {
                index.insert(rec.id, i);
            }
        }

        let mut nodes: Vec<TreeNode<'a>> = records
            .iter()
            .map(|record| TreeNode {
                record,
                parent: None,
                children: Vec::new(),
                weight: 1,
                placement: placement_for(record, &mut warnings),
            })
            .collect();

        for (i, rec) in records.iter().enumerate() {
            let Some(parent_id) = rec.parent_id else { continue };
            match index.get(&parent_id) {
                Some(&p) => {
                    nodes[i].parent = Some(p);
                    nodes[p].children.push(i);
                }
                None => {
                    debug!("message {} has unknown parent {}, promoting to root", rec.id, parent_id);
                    warnings.push(LayoutWarning::OrphanPromoted { id: rec.id, parent_id });
                }
            }
        }

        let mut tree = ThreadTree {
            roots: (0..nodes.len()).filter(|&i| nodes[i].parent.is_none()).collect(),
            nodes,
        };
        tree.break_cycles(&mut warnings);
        tree.compute_weights();
        (tree, warnings)
    }

    fn break_cycles(&mut self, warnings: &mut Vec<LayoutWarning>) {
        let mut reached = vec![false; self.nodes.len()];
        for &r in &self.roots {
            self.mark_reachable(r, &mut reached);
        }

        let mut promoted = false;
        while let Some(start) = reached.iter().position(|&seen| !seen) {
            // Walk up until a node repeats: it and everything after it on
            // the walk form the cycle.
            let mut walk = vec![start];
            let mut on_walk = vec![false; self.nodes.len()];
            on_walk[start] = true;
            let mut cur = start;
            let cycle_start = loop {
                // Unreached nodes always have a parent; roots are reached.
                let Some(p) = self.nodes[cur].parent else { break walk.len() - 1 };
                if on_walk[p] {
                    break walk.iter().position(|&n| n == p).unwrap_or(0);
                }
                on_walk[p] = true;
                walk.push(p);
                cur = p;
            };
            let cut = walk[cycle_start..].iter().copied().min().unwrap_or(start);

            if let Some(p) = self.nodes[cut].parent.take() {
                self.nodes[p].children.retain(|&c| c != cut);
            }
            let id = self.nodes[cut].record.id;
            warn!("message {id} is part of a parent cycle, placing it as a root");
            warnings.push(LayoutWarning::CycleBroken { id });
            self.roots.push(cut);
            self.mark_reachable(cut, &mut reached);
            promoted = true;
        }

        if promoted {
            self.roots.sort_unstable();
        }
    }

    fn mark_reachable(&self, from: usize, reached: &mut [bool]) {
        let mut stack = vec![from];
        while let Some(n) = stack.pop() {
            if reached[n] {
                continue;
            }
            reached[n] = true;
            stack.extend(self.nodes[n].children.iter().copied());
        }
    }

    /// Pre-order over the whole forest, roots and children in input order.
    pub fn pre_order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev().copied());
        }
        out
    }

    fn compute_weights(&mut self) {
        for n in self.pre_order().into_iter().rev() {
            let below: usize = self.nodes[n].children.iter().map(|&c| self.nodes[c].weight).sum();
            self.nodes[n].weight = 1 + below;
        }
    }

    pub fn total_root_weight(&self) -> usize {
        self.roots.iter().map(|&r| self.nodes[r].weight).sum()
    }

    /// Split the full turn among roots by weight: first sector starts at the
    /// top (-pi/2) and sectors proceed clockwise.
    pub fn root_sectors(&self) -> Vec<RootSector> {
        let total = self.total_root_weight().max(1) as f64;
        let mut cursor = -FRAC_PI_2;
        self.roots
            .iter()
            .map(|&node| {
                let sector = TAU * self.nodes[node].weight as f64 / total;
                let s = RootSector { node, start_angle: cursor + sector / 2.0, sector };
                cursor += sector;
                s
            })
            .collect()
    }
}

fn placement_for(record: &MessageRecord, warnings: &mut Vec<LayoutWarning>) -> Placement {
    match record.descriptor() {
        Some(Ok(descriptor)) => Placement::Replayed(descriptor),
        Some(Err(e)) => {
            warn!("{e}");
            warnings.push(LayoutWarning::InvalidDescriptor { id: record.id, message: e.to_string() });
            Placement::Fresh
        }
        None => Placement::Fresh,
    }
}
