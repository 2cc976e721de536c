// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pass-through stage

use crate::error::FilterError;
use crate::pipeline::DocumentHandler;
use x3dfilter_core::DocumentEvent;

/// Forwards every event unchanged. Useful as pipeline plumbing and as the
/// baseline in tests.
pub struct Identity<D> {
    downstream: D,
}

impl<D: DocumentHandler> Identity<D> {
    pub fn new(downstream: D) -> Self {
        Self { downstream }
    }

    pub fn into_downstream(self) -> D {
        self.downstream
    }
}

impl<D: DocumentHandler> DocumentHandler for Identity<D> {
    fn handle(&mut self, event: DocumentEvent) -> Result<(), FilterError> {
        self.downstream.handle(event)
    }
}
