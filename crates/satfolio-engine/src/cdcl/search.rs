//! Propagation, conflict analysis and the restart loop.

use std::mem;
use std::sync::Arc;

use satfolio_core::{Lit, Result};

use super::clause::{CRef, Watch};
use super::Cdcl;
use crate::engine::StepStatus;

/// Jumps longer than this backtrack chronologically when enabled.
const CHRONO_LIMIT: u32 = 100;

pub(super) enum Propagation {
    Done,
    Conflict(CRef),
    Interrupted,
}

pub(super) struct Learnt {
    pub(super) lits: Vec<Lit>,
    pub(super) backtrack: u32,
    pub(super) lbd: u32,
}

#[inline]
fn value_of(assigns: &[i8], lit: Lit) -> i8 {
    let value = assigns[lit.var().index()];
    if lit.is_negated() {
        -value
    } else {
        value
    }
}

fn luby(y: f64, mut x: u32) -> f64 {
    let mut size = 1;
    let mut seq = 0;
    while size < x + 1 {
        seq += 1;
        size = 2 * size + 1;
    }
    while size - 1 != x {
        size = (size - 1) >> 1;
        seq -= 1;
        x %= size;
    }
    y.powi(seq)
}

impl Cdcl {
    #[inline]
    pub(super) fn lit_value(&self, lit: Lit) -> i8 {
        value_of(&self.assigns, lit)
    }

    #[inline]
    pub(super) fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    pub(super) fn enqueue(&mut self, lit: Lit, reason: Option<CRef>) {
        let v = lit.var().index();
        self.assigns[v] = if lit.is_negated() { -1 } else { 1 };
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(lit);
    }

    fn new_decision(&mut self, lit: Lit) {
        self.trail_lim.push(self.trail.len());
        self.stats.decisions += 1;
        self.enqueue(lit, None);
    }

    pub(super) fn backtrack(&mut self, level: u32) {
        if self.decision_level() <= level {
            return;
        }
        let keep = self.trail_lim[level as usize];
        for i in (keep..self.trail.len()).rev() {
            let lit = self.trail[i];
            let v = lit.var().index();
            self.saved_phase[v] = !lit.is_negated();
            self.assigns[v] = 0;
            self.reason[v] = None;
            self.heap.push(lit.var(), &self.activity.scores);
        }
        self.trail.truncate(keep);
        self.trail_lim.truncate(level as usize);
        self.qhead = self.qhead.min(keep);
    }

    fn attach(&mut self, lits: Vec<Lit>, learnt: bool, lbd: u32) -> CRef {
        let (a, b) = (lits[0], lits[1]);
        let cref = self.db.add(lits, learnt, lbd);
        self.watches[a.index()].push(Watch { cref, blocker: b });
        self.watches[b.index()].push(Watch { cref, blocker: a });
        cref
    }

    /// Adds a clause while at decision level 0. Returns false once the
    /// formula is known to be unsatisfiable.
    pub(super) fn add_clause_at_root(&mut self, raw: &[Lit], learnt: bool) -> bool {
        let mut lits = raw.to_vec();
        lits.sort_unstable();
        lits.dedup();
        if lits.windows(2).any(|w| w[0].var() == w[1].var()) {
            return true;
        }
        if lits.iter().any(|&l| self.lit_value(l) == 1) {
            return true;
        }
        lits.retain(|&l| self.lit_value(l) == 0);
        match lits.len() {
            0 => {
                self.ok = false;
                false
            }
            1 => {
                self.enqueue(lits[0], None);
                true
            }
            len => {
                self.attach(lits, learnt, len as u32);
                true
            }
        }
    }

    pub(super) fn propagate(&mut self) -> Propagation {
        while self.qhead < self.trail.len() {
            if self.stop.is_forced_stop_requested() {
                return Propagation::Interrupted;
            }
            let p = self.trail[self.qhead];
            self.qhead += 1;
            self.stats.propagations += 1;
            let false_lit = !p;

            let mut ws = mem::take(&mut self.watches[false_lit.index()]);
            let mut conflict = None;
            let mut i = 0;
            let mut j = 0;
            while i < ws.len() {
                let w = ws[i];
                i += 1;
                if value_of(&self.assigns, w.blocker) == 1 {
                    ws[j] = w;
                    j += 1;
                    continue;
                }

                let lits = &mut self.db.clauses[w.cref as usize].lits;
                if lits[0] == false_lit {
                    lits.swap(0, 1);
                }
                let first = lits[0];
                let kept = Watch {
                    cref: w.cref,
                    blocker: first,
                };
                if first != w.blocker && value_of(&self.assigns, first) == 1 {
                    ws[j] = kept;
                    j += 1;
                    continue;
                }

                let mut moved = false;
                for k in 2..lits.len() {
                    if value_of(&self.assigns, lits[k]) != -1 {
                        lits.swap(1, k);
                        self.watches[lits[1].index()].push(kept);
                        moved = true;
                        break;
                    }
                }
                if moved {
                    continue;
                }

                ws[j] = kept;
                j += 1;
                if value_of(&self.assigns, first) == -1 {
                    conflict = Some(w.cref);
                    while i < ws.len() {
                        ws[j] = ws[i];
                        j += 1;
                        i += 1;
                    }
                } else {
                    self.enqueue(first, Some(w.cref));
                }
            }
            ws.truncate(j);
            self.watches[false_lit.index()] = ws;

            if let Some(cref) = conflict {
                self.qhead = self.trail.len();
                return Propagation::Conflict(cref);
            }
        }
        Propagation::Done
    }

    fn bump_var(&mut self, lit: Lit) {
        self.activity.bump(lit.var());
        self.heap.increased(lit.var(), &self.activity.scores);
    }

    fn compute_lbd(&mut self, lits: &[Lit]) -> u32 {
        self.stamp += 1;
        let mut lbd = 0;
        for lit in lits {
            let level = self.level[lit.var().index()] as usize;
            if self.level_stamp[level] != self.stamp {
                self.level_stamp[level] = self.stamp;
                lbd += 1;
            }
        }
        lbd
    }

    /// First-UIP conflict analysis with local minimization.
    pub(super) fn analyze(&mut self, mut confl: CRef) -> Result<Learnt> {
        let current = self.decision_level();
        let mut lits = vec![Lit::from_index(0)];
        let mut path = 0usize;
        let mut index = self.trail.len();
        let mut skip = 0;

        let uip = loop {
            let clause_len = self.db.get(confl).lits.len();
            for k in skip..clause_len {
                let q = self.db.get(confl).lits[k];
                let v = q.var().index();
                if !self.seen[v] && self.level[v] > 0 {
                    self.seen[v] = true;
                    self.bump_var(q);
                    if self.level[v] >= current {
                        path += 1;
                    } else {
                        lits.push(q);
                    }
                }
            }
            if path == 0 {
                return Err(self.fault("conflict without a literal at the current level"));
            }

            let p = loop {
                if index == 0 {
                    return Err(self.fault("conflict analysis ran off the trail"));
                }
                index -= 1;
                let lit = self.trail[index];
                if self.seen[lit.var().index()] {
                    break lit;
                }
            };
            self.seen[p.var().index()] = false;
            path -= 1;
            if path == 0 {
                break p;
            }
            confl = match self.reason[p.var().index()] {
                Some(reason) => reason,
                None => return Err(self.fault("implied literal without a reason")),
            };
            skip = 1;
        };
        lits[0] = !uip;

        let marked = lits.clone();
        let mut j = 1;
        for i in 1..lits.len() {
            let lit = lits[i];
            let redundant = match self.reason[lit.var().index()] {
                None => false,
                Some(reason) => self.db.get(reason).lits[1..].iter().all(|q| {
                    let v = q.var().index();
                    self.seen[v] || self.level[v] == 0
                }),
            };
            if !redundant {
                lits[j] = lit;
                j += 1;
            }
        }
        lits.truncate(j);
        for lit in &marked[1..] {
            self.seen[lit.var().index()] = false;
        }

        let backtrack = if lits.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            for i in 2..lits.len() {
                if self.level[lits[i].var().index()] > self.level[lits[max_i].var().index()] {
                    max_i = i;
                }
            }
            lits.swap(1, max_i);
            self.level[lits[1].var().index()]
        };
        let lbd = self.compute_lbd(&lits);
        Ok(Learnt {
            lits,
            backtrack,
            lbd,
        })
    }

    fn pick_branch(&mut self) -> Option<Lit> {
        loop {
            let var = self.heap.pop(&self.activity.scores)?;
            let v = var.index();
            if self.assigns[v] != 0 {
                continue;
            }
            let use_target = self.target_len > 0
                && match self.options.target {
                    2 => true,
                    1 => self.search.stable_mode,
                    _ => false,
                };
            let value = if use_target {
                self.target_phase[v]
            } else {
                self.saved_phase[v]
            };
            return Some(Lit::new(var, !value));
        }
    }

    fn update_target(&mut self) {
        if self.options.target == 0 || self.trail.len() <= self.target_len {
            return;
        }
        self.target_len = self.trail.len();
        for lit in &self.trail {
            self.target_phase[lit.var().index()] = !lit.is_negated();
        }
    }

    fn restart_limit(&self) -> u64 {
        let unit = if self.search.stable_mode {
            self.options.restart_interval * 8
        } else {
            self.options.restart_interval
        };
        (luby(2.0, self.search.restart_count) as u64).saturating_mul(unit)
    }

    fn switch_mode(&mut self) {
        self.search.stable_mode = !self.search.stable_mode;
        self.search.mode_interval = self.search.mode_interval.saturating_mul(2);
        self.search.next_mode_switch = self.stats.conflicts + self.search.mode_interval;
        self.search.restart_count = 0;
        self.activity.decay = if self.search.stable_mode { 0.975 } else { 0.95 };
    }

    fn restart(&mut self) {
        self.backtrack(0);
        self.stats.restarts += 1;
        self.search.restart_count += 1;
        self.search.conflicts_since_restart = 0;
        self.target_len = 0;
        if self.options.stable == 1 && self.stats.conflicts >= self.search.next_mode_switch {
            self.switch_mode();
        }
        if self.stats.conflicts >= self.search.next_reduce {
            self.reduce();
        }
        self.import_shared();
    }

    /// Deletes half of the learned clauses above tier1 and every clause
    /// satisfied at the root. Runs at decision level 0 only.
    fn reduce(&mut self) {
        for lit in &self.trail {
            self.reason[lit.var().index()] = None;
        }

        let tier1 = self.options.tier1;
        let mut candidates: Vec<(u32, usize, usize)> = self
            .db
            .clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| c.learnt && c.lbd > tier1)
            .map(|(i, c)| (c.lbd, c.lits.len(), i))
            .collect();
        candidates.sort_unstable_by(|a, b| b.cmp(a));
        let mut remove = vec![false; self.db.len()];
        for &(_, _, i) in &candidates[..candidates.len() / 2] {
            remove[i] = true;
        }

        let before = self.db.len();
        let assigns = &self.assigns;
        let mut idx = 0;
        self.db.retain(|clause| {
            let keep =
                !remove[idx] && !clause.lits.iter().any(|&l| value_of(assigns, l) == 1);
            idx += 1;
            keep
        });
        self.rebuild_watches();

        self.search.next_reduce = self.stats.conflicts + self.search.reduce_inc;
        self.search.reduce_inc += 300;
        self.stats.reductions += 1;
        tracing::trace!(
            event = "clauses_reduced",
            worker = self.ordinal,
            removed = before - self.db.len(),
            learnt = self.db.num_learnt,
        );
    }

    fn rebuild_watches(&mut self) {
        for list in self.watches.iter_mut() {
            list.clear();
        }
        for (i, clause) in self.db.clauses.iter().enumerate() {
            let cref = i as CRef;
            let (a, b) = (clause.lits[0], clause.lits[1]);
            self.watches[a.index()].push(Watch { cref, blocker: b });
            self.watches[b.index()].push(Watch { cref, blocker: a });
        }
    }

    fn import_shared(&mut self) {
        let incoming: Vec<Arc<[Lit]>> = match self.share.as_ref() {
            Some(port) => port.imports().collect(),
            None => return,
        };
        for lits in incoming {
            if !self.ok {
                break;
            }
            if lits.iter().any(|l| l.var().index() >= self.num_vars) {
                continue;
            }
            self.stats.imported += 1;
            self.add_clause_at_root(&lits, true);
        }
    }

    /// Searches until a definitive answer, the step's conflict budget, or a
    /// forced stop.
    pub(super) fn run_step(&mut self) -> Result<StepStatus> {
        let budget = self.stats.conflicts + self.options.step_conflicts;
        if self.decision_level() == 0 {
            self.import_shared();
            if !self.ok {
                return Ok(StepStatus::Unsatisfiable);
            }
        }
        loop {
            match self.propagate() {
                Propagation::Interrupted => return Ok(StepStatus::Unfinished),
                Propagation::Conflict(confl) => {
                    self.stats.conflicts += 1;
                    self.search.conflicts_since_restart += 1;
                    if self.decision_level() == 0 {
                        self.ok = false;
                        return Ok(StepStatus::Unsatisfiable);
                    }
                    let learnt = self.analyze(confl)?;
                    let level = self.decision_level();
                    let target = if self.options.chrono
                        && learnt.lits.len() > 1
                        && level - learnt.backtrack > CHRONO_LIMIT
                    {
                        level - 1
                    } else {
                        learnt.backtrack
                    };
                    self.backtrack(target);
                    if let Some(port) = &self.share {
                        if port.export(&learnt.lits) {
                            self.stats.exported += 1;
                        }
                    }
                    let asserting = learnt.lits[0];
                    if learnt.lits.len() == 1 {
                        self.enqueue(asserting, None);
                    } else {
                        let cref = self.attach(learnt.lits, true, learnt.lbd);
                        self.enqueue(asserting, Some(cref));
                    }
                    self.activity.decay();
                }
                Propagation::Done => {
                    if self.stop.is_forced_stop_requested() {
                        return Ok(StepStatus::Unfinished);
                    }
                    if self.search.conflicts_since_restart >= self.restart_limit() {
                        self.restart();
                        if !self.ok {
                            return Ok(StepStatus::Unsatisfiable);
                        }
                        continue;
                    }
                    if self.stats.conflicts >= budget {
                        return Ok(StepStatus::Unfinished);
                    }
                    self.update_target();
                    match self.pick_branch() {
                        Some(lit) => self.new_decision(lit),
                        None => return Ok(StepStatus::Satisfiable),
                    }
                }
            }
        }
    }
}
