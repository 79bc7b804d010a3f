use {
    candle_core::{
        bail,
        Result,
        Tensor,
    },
    rand::{
        distributions::Uniform,
        thread_rng,
        Rng,
    },
    std::collections::VecDeque,
    unzip_n::unzip_n,
};

unzip_n!(5);

/// A transition in the replay buffer.
///
/// Transitions are immutable once stored: they are only ever dropped again
/// by oldest-first eviction when the buffer is at capacity.
///
/// # Fields
///
/// * `state` - The state tensor.
/// * `action` - The action tensor.
/// * `reward` - The reward tensor.
/// * `next_state` - The next state tensor.
/// * `terminated` - The terminated flag tensor (1.0 or 0.0).
#[derive(Clone)]
pub struct Transition {
    state: Tensor,
    action: Tensor,
    reward: Tensor,
    next_state: Tensor,
    terminated: Tensor,
}
impl Transition {
    fn new(
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: &Tensor,
    ) -> Self {
        Self {
            state: state.clone(),
            action: action.clone(),
            reward: reward.clone(),
            next_state: next_state.clone(),
            terminated: terminated.clone(),
        }
    }
}

/// A replay buffer for off-policy algorithms.
///
/// The replay buffer is implemented as a simple ring buffer / VecDeque.
///
/// # Fields
///
/// * `buffer` - The buffer of transitions.
/// * `capacity` - The capacity of the buffer.
/// * `size` - The current size of the buffer.
#[derive(Clone)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
    size: usize,
}
impl ReplayBuffer {
    /// Create a new replay buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    /// Push a transition into the buffer.
    ///
    /// If the buffer is full, the oldest transition is removed to make room
    /// for the new transition. A zero-capacity buffer stores nothing.
    pub fn push(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: &Tensor,
    ) {
        if self.capacity == 0 {
            return;
        }
        if self.size == self.capacity {
            self.buffer.pop_front();
        } else {
            self.size += 1;
        }
        self.buffer.push_back(Transition::new(
            state, action, reward, next_state, terminated,
        ));
    }

    /// Sample a random batch of transitions from the buffer.
    ///
    /// Transitions are drawn uniformly and independently (with replacement
    /// across draws), independent of insertion order, and the buffer is not
    /// mutated. The batch is returned as five aligned, batched tensors.
    ///
    /// Fails when fewer than `batch_size` transitions are stored. The warm-up
    /// phase is designed to make that unreachable during training, so the
    /// error is an invariant violation and should be propagated, not retried.
    #[allow(clippy::type_complexity)]
    pub fn random_batch(
        &self,
        batch_size: usize,
    ) -> Result<(Tensor, Tensor, Tensor, Tensor, Tensor)> {
        if self.size < batch_size {
            bail!(
                "insufficient data in replay buffer: {} transitions stored, {} requested",
                self.size,
                batch_size,
            )
        }

        let transition_to_tuple =
            |t: &Transition| -> Result<(Tensor, Tensor, Tensor, Tensor, Tensor)> {
                Ok((
                    t.state.unsqueeze(0)?,
                    t.action.unsqueeze(0)?,
                    t.reward.unsqueeze(0)?,
                    t.next_state.unsqueeze(0)?,
                    t.terminated.unsqueeze(0)?,
                ))
            };

        let transitions: Vec<&Transition> = thread_rng()
            .sample_iter(Uniform::from(0..self.size))
            .take(batch_size)
            .map(|i| &self.buffer[i])
            .collect();

        let (states, actions, rewards, next_states, terminateds) = transitions
            .into_iter()
            .map(transition_to_tuple)
            .collect::<Result<Vec<(Tensor, Tensor, Tensor, Tensor, Tensor)>>>()?
            .into_iter()
            .unzip_n_vec();

        Ok((
            Tensor::cat(&states, 0)?,
            Tensor::cat(&actions, 0)?,
            Tensor::cat(&rewards, 0)?,
            Tensor::cat(&next_states, 0)?,
            Tensor::cat(&terminateds, 0)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn push_numbered(
        buffer: &mut ReplayBuffer,
        id: f64,
        device: &Device,
    ) {
        let state = Tensor::new(vec![id, id], device).unwrap();
        let action = Tensor::new(vec![id], device).unwrap();
        let reward = Tensor::new(vec![id], device).unwrap();
        let terminated = Tensor::new(vec![0.0], device).unwrap();
        buffer.push(&state, &action, &reward, &state, &terminated);
    }

    #[test]
    fn size_never_exceeds_capacity_and_oldest_are_evicted() {
        let device = Device::Cpu;
        let capacity = 8;
        let mut buffer = ReplayBuffer::new(capacity);

        for id in 0..20 {
            push_numbered(&mut buffer, id as f64, &device);
            assert!(buffer.len() <= capacity);
        }
        assert!(buffer.is_full());

        // After 20 pushes only transitions 12..20 may remain.
        let (_, _, rewards, _, _) = buffer.random_batch(capacity).unwrap();
        for id in rewards.flatten_all().unwrap().to_vec1::<f64>().unwrap() {
            assert!((12.0..20.0).contains(&id), "evicted transition {id} sampled");
        }
    }

    #[test]
    fn batch_tensors_are_aligned_and_shaped() {
        let device = Device::Cpu;
        let mut buffer = ReplayBuffer::new(64);
        for id in 0..32 {
            push_numbered(&mut buffer, id as f64, &device);
        }

        let batch_size = 16;
        let (states, actions, rewards, next_states, terminateds) =
            buffer.random_batch(batch_size).unwrap();

        assert_eq!(states.dims(), &[batch_size, 2]);
        assert_eq!(actions.dims(), &[batch_size, 1]);
        assert_eq!(rewards.dims(), &[batch_size, 1]);
        assert_eq!(next_states.dims(), &[batch_size, 2]);
        assert_eq!(terminateds.dims(), &[batch_size, 1]);

        // Rows stay aligned by index: the id was written into every field.
        let states = states.to_vec2::<f64>().unwrap();
        let rewards = rewards.to_vec2::<f64>().unwrap();
        for (state, reward) in states.iter().zip(rewards.iter()) {
            assert_eq!(state[0], reward[0]);
        }

        // Sampling does not mutate the buffer.
        assert_eq!(buffer.len(), 32);
    }

    #[test]
    fn a_zero_capacity_buffer_stores_nothing() {
        let device = Device::Cpu;
        let mut buffer = ReplayBuffer::new(0);
        for id in 0..4 {
            push_numbered(&mut buffer, id as f64, &device);
        }
        assert!(buffer.is_empty());
        assert_eq!(buffer.buffer.len(), 0);
    }

    #[test]
    fn sampling_more_than_stored_is_an_error() {
        let device = Device::Cpu;
        let mut buffer = ReplayBuffer::new(64);
        for id in 0..4 {
            push_numbered(&mut buffer, id as f64, &device);
        }
        assert!(buffer.random_batch(5).is_err());
        assert!(buffer.random_batch(4).is_ok());
    }
}
