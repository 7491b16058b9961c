use crate::{connectivity::Connections, neuron::Neuron};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synapse {
    pub post_syn_nid: usize,
}

/// Outgoing synapses grouped by presynaptic neuron, in the order they were listed.
/// Duplicate pairs are kept as separate synapses.
#[derive(Debug, Clone)]
pub struct SynapseTable {
    nid_to_synapses: Vec<Vec<Synapse>>,
    weight: f64,
}

impl SynapseTable {
    pub fn new(nb_neurons: usize, connections: &Connections, weight: f64) -> Self {
        let mut nid_to_synapses = vec![Vec::new(); nb_neurons];

        for (pre_syn_nid, post_syn_nid) in connections.iter() {
            nid_to_synapses[pre_syn_nid].push(Synapse { post_syn_nid });
        }

        Self {
            nid_to_synapses,
            weight,
        }
    }

    pub fn outgoing(&self, pre_syn_nid: usize) -> &[Synapse] {
        &self.nid_to_synapses[pre_syn_nid]
    }

    pub fn num_synapses(&self) -> usize {
        self.nid_to_synapses.iter().map(Vec::len).sum()
    }

    /// Adds the weight to the postsynaptic voltage once per synapse leaving one of
    /// `spiked_nids`.
    pub fn transmit(&self, spiked_nids: &[usize], neurons: &mut [Neuron]) {
        for &pre_syn_nid in spiked_nids {
            for synapse in self.outgoing(pre_syn_nid) {
                neurons[synapse.post_syn_nid].apply_psp(self.weight);
            }
        }
    }
}
