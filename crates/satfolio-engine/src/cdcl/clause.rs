//! Clause storage.

use satfolio_core::Lit;

pub(crate) type CRef = u32;

#[derive(Debug, Clone)]
pub(crate) struct Clause {
    pub(crate) lits: Vec<Lit>,
    pub(crate) learnt: bool,
    pub(crate) lbd: u32,
}

/// Watch list entry. `blocker` is some other literal of the clause; when it
/// is true the clause need not be visited.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Watch {
    pub(crate) cref: CRef,
    pub(crate) blocker: Lit,
}

#[derive(Debug, Default)]
pub(crate) struct ClauseDb {
    pub(crate) clauses: Vec<Clause>,
    pub(crate) num_learnt: usize,
}

impl ClauseDb {
    pub(crate) fn clear(&mut self) {
        self.clauses.clear();
        self.num_learnt = 0;
    }

    pub(crate) fn add(&mut self, lits: Vec<Lit>, learnt: bool, lbd: u32) -> CRef {
        let cref = self.clauses.len() as CRef;
        if learnt {
            self.num_learnt += 1;
        }
        self.clauses.push(Clause { lits, learnt, lbd });
        cref
    }

    #[inline]
    pub(crate) fn get(&self, cref: CRef) -> &Clause {
        &self.clauses[cref as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Keeps the clauses for which `keep` returns true. Indices change, so
    /// callers must not hold any `CRef` across this call.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&Clause) -> bool) {
        self.clauses.retain(|c| keep(c));
        self.num_learnt = self.clauses.iter().filter(|c| c.learnt).count();
    }
}
