//! Directed multigraph topologies given as parallel pre/post index lists.
//!
//! An empty list always means "no synapses". Nothing in this crate ever reads it as
//! "connect everything".

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simple_error::{SimpleError, SimpleResult};

use crate::util;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connections {
    pub pre: Vec<usize>,
    pub post: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Disconnected,
    Full,
    FullNoLoops,
    Simplex,
    Torus,
    SimplexTorus,
    Parents,
}

impl Connections {
    pub fn new(pre: Vec<usize>, post: Vec<usize>) -> SimpleResult<Self> {
        if pre.len() != post.len() {
            return Err(SimpleError::new(format!(
                "pre and post index lists differ in length: {} vs {}",
                pre.len(),
                post.len()
            )));
        }

        Ok(Self { pre, post })
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pre.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pre.iter().copied().zip(self.post.iter().copied())
    }

    pub fn push(&mut self, pre: usize, post: usize) {
        self.pre.push(pre);
        self.post.push(post);
    }

    /// Appends `other` with every index shifted by `offset`.
    pub fn extend_shifted(&mut self, other: &Connections, offset: usize) {
        for (pre, post) in other.iter() {
            self.push(pre + offset, post + offset);
        }
    }

    pub fn out_degree(&self, nid: usize) -> usize {
        self.pre.iter().filter(|pre| **pre == nid).count()
    }

    pub fn validate(&self, nb_neurons: usize) -> SimpleResult<()> {
        if self.pre.len() != self.post.len() {
            return Err(SimpleError::new(format!(
                "pre and post index lists differ in length: {} vs {}",
                self.pre.len(),
                self.post.len()
            )));
        }

        for (pre, post) in self.iter() {
            if pre >= nb_neurons || post >= nb_neurons {
                return Err(SimpleError::new(format!(
                    "synapse ({}, {}) out of range for {} neurons",
                    pre, post, nb_neurons
                )));
            }
        }

        Ok(())
    }
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Disconnected => "disconnected",
            Topology::Full => "full",
            Topology::FullNoLoops => "full_no_loops",
            Topology::Simplex => "simplex",
            Topology::Torus => "torus",
            Topology::SimplexTorus => "simplex_torus",
            Topology::Parents => "parents",
        }
    }

    pub fn connections(&self, nb_neurons: usize) -> SimpleResult<Connections> {
        match self {
            // returns before any generic construction
            Topology::Disconnected => Ok(Connections::disconnected()),
            Topology::Full => Ok(full(nb_neurons)),
            Topology::FullNoLoops => Ok(full_no_loops(nb_neurons)),
            Topology::Simplex => Ok(simplex(nb_neurons)),
            Topology::Torus => {
                let side = square_side(nb_neurons)?;
                Ok(torus(side, side))
            }
            Topology::SimplexTorus => {
                let side = square_side(nb_neurons)?;
                Ok(simplex_torus(side, side))
            }
            Topology::Parents => {
                if nb_neurons < 2 {
                    return Err(SimpleError::new(
                        "parents topology needs at least the two child neurons",
                    ));
                }

                let nb_parents = nb_neurons - 2;
                let range_sizes: Vec<usize> = (0..3)
                    .map(|part_id| util::get_partition_range(3, part_id, nb_parents).len())
                    .collect();

                Ok(parents(range_sizes[0], range_sizes[1], range_sizes[2]))
            }
        }
    }
}

impl FromStr for Topology {
    type Err = SimpleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(Topology::Disconnected),
            "full" => Ok(Topology::Full),
            "full_no_loops" => Ok(Topology::FullNoLoops),
            "simplex" => Ok(Topology::Simplex),
            "torus" => Ok(Topology::Torus),
            "simplex_torus" => Ok(Topology::SimplexTorus),
            "parents" => Ok(Topology::Parents),
            _ => Err(SimpleError::new(format!("unknown topology: {}", s))),
        }
    }
}

pub fn generate_connections(topology_name: &str, nb_neurons: usize) -> SimpleResult<Connections> {
    let topology: Topology = topology_name.parse()?;
    topology.connections(nb_neurons)
}

/// All ordered pairs, self-loops included.
pub fn full(nb_neurons: usize) -> Connections {
    let mut connections = Connections::default();

    for post in 0..nb_neurons {
        for pre in 0..nb_neurons {
            connections.push(pre, post);
        }
    }

    connections
}

pub fn full_no_loops(nb_neurons: usize) -> Connections {
    let mut connections = Connections::default();

    for pre in 0..nb_neurons {
        for post in (0..nb_neurons).filter(|post| *post != pre) {
            connections.push(pre, post);
        }
    }

    connections
}

/// Feed-forward clique over the linear ordering 0..n: every neuron projects to every
/// neuron after it, the sink first.
pub fn simplex(nb_neurons: usize) -> Connections {
    let mut connections = Connections::default();
    let dim = nb_neurons.saturating_sub(1);

    for pre in 0..dim {
        for j in 0..(dim - pre) {
            connections.push(pre, dim - j);
        }
    }

    connections
}

/// Product of two directed cycles. Node (x, y) has index `y * cycle1 + x` and projects
/// to (x + 1, y) and (x, y + 1), wrapping around.
pub fn torus(cycle1: usize, cycle2: usize) -> Connections {
    let mut connections = Connections::default();

    for y in 0..cycle2 {
        for x in 0..cycle1 {
            connections.push(y * cycle1 + x, y * cycle1 + (x + 1) % cycle1);
        }
    }

    for y in 0..cycle2 {
        for x in 0..cycle1 {
            connections.push(y * cycle1 + x, x + cycle1 * ((y + 1) % cycle2));
        }
    }

    connections
}

/// Torus plus one diagonal edge per node, to (x + 1, y + 1).
pub fn simplex_torus(cycle1: usize, cycle2: usize) -> Connections {
    let mut connections = torus(cycle1, cycle2);

    for y in 0..cycle2 {
        for x in 0..cycle1 {
            connections.push(y * cycle1 + x, ((y + 1) % cycle2) * cycle1 + (x + 1) % cycle1);
        }
    }

    connections
}

/// Fan-in onto two children (indices 0 and 1) from three consecutive parent groups
/// starting at index 2: the first group feeds child 0, the second feeds both children,
/// the third feeds child 1.
pub fn parents(nb_p1: usize, nb_p12: usize, nb_p2: usize) -> Connections {
    let mut connections = Connections::default();
    let p12_start = 2 + nb_p1;
    let p2_start = p12_start + nb_p12;

    for pre in 2..p12_start {
        connections.push(pre, 0);
    }

    for pre in p12_start..p2_start {
        connections.push(pre, 0);
    }

    for pre in p12_start..p2_start {
        connections.push(pre, 1);
    }

    for pre in p2_start..(p2_start + nb_p2) {
        connections.push(pre, 1);
    }

    connections
}

fn square_side(nb_neurons: usize) -> SimpleResult<usize> {
    let side = (nb_neurons as f64).sqrt().round() as usize;

    if side * side != nb_neurons {
        return Err(SimpleError::new(format!(
            "torus topologies need a perfect square number of neurons, got {}",
            nb_neurons
        )));
    }

    Ok(side)
}
