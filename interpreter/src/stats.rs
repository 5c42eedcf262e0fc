use std::collections::BTreeMap;
use std::fmt;

use mash::NodeClass;

/// How many nodes of each kind were started during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub frames: usize,
    pub code: usize,
    pub text: usize,
    pub includes: usize,
}

impl Stats {
    pub fn new(frames: usize, code: usize, text: usize) -> Self {
        Stats {
            frames,
            code,
            text,
            includes: 0,
        }
    }

    pub fn with_includes(mut self, includes: usize) -> Self {
        self.includes = includes;
        self
    }

    pub fn record(&mut self, class: NodeClass) {
        match class {
            NodeClass::Frame => self.frames += 1,
            NodeClass::Code => self.code += 1,
            NodeClass::Text => self.text += 1,
            NodeClass::Include => self.includes += 1,
        }
    }

    pub fn get(&self, class: NodeClass) -> usize {
        match class {
            NodeClass::Frame => self.frames,
            NodeClass::Code => self.code,
            NodeClass::Text => self.text,
            NodeClass::Include => self.includes,
        }
    }

    /// The counts keyed by kind.
    pub fn as_map(&self) -> BTreeMap<NodeClass, usize> {
        [
            NodeClass::Frame,
            NodeClass::Code,
            NodeClass::Text,
            NodeClass::Include,
        ]
        .into_iter()
        .map(|class| (class, self.get(class)))
        .collect()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames; {}+{} leaves; {} includes",
            self.frames, self.code, self.text, self.includes
        )
    }
}
