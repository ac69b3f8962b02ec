// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Entity handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity handle: an index into the per-type containers plus the epoch of the
/// entity manager that issued it.
///
/// Handles carry no payload and hold no reference to their manager; every
/// dereference goes through the manager, which rejects handles from an older
/// epoch (issued before a `clear_self`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    epoch: u32,
}

impl Entity {
    /// Null handle: sentinel index, never valid.
    pub const NULL: Entity = Entity {
        index: u32::MAX,
        epoch: 0,
    };

    pub(crate) const fn new(index: u32, epoch: u32) -> Self {
        Self { index, epoch }
    }

    pub const fn index(&self) -> u32 {
        self.index
    }

    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    pub const fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index, self.epoch)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
