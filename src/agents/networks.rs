use {
    candle_core::{
        DType,
        Device,
        Error,
        Module,
        Result,
        Tensor,
        Var,
    },
    candle_nn::{
        func,
        linear,
        sequential::seq,
        Activation,
        Sequential,
        VarBuilder,
        VarMap,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::path::Path,
};


/// The activation applied to the output of an [`Mlp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputActivation {
    Identity,
    Tanh,
}

/// The shape of an [`Mlp`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlpConfig {
    pub input_size: usize,
    pub output_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub output_activation: OutputActivation,
}
impl MlpConfig {
    pub fn new(
        input_size: usize,
        output_size: usize,
        hidden_sizes: &[usize],
        output_activation: OutputActivation,
    ) -> Self {
        Self {
            input_size,
            output_size,
            hidden_sizes: hidden_sizes.to_vec(),
            output_activation,
        }
    }

    /// The (in, out) dimensions of every linear layer.
    pub fn dims(&self) -> Vec<(usize, usize)> {
        let sizes: Vec<usize> = std::iter::once(self.input_size)
            .chain(self.hidden_sizes.iter().copied())
            .chain(std::iter::once(self.output_size))
            .collect();
        sizes.windows(2).map(|w| (w[0], w[1])).collect()
    }
}


/// A feed-forward network with ReLU activations between the layers.
///
/// Every network owns its own [`VarMap`], so a target network is simply a
/// second `Mlp` with the same config whose parameters are kept in sync
/// through [`hard_update`] and [`track`].
pub struct Mlp {
    config: MlpConfig,
    varmap: VarMap,
    network: Sequential,
    names: Vec<String>,
}

impl Mlp {
    pub fn new(
        device: &Device,
        dtype: DType,
        config: &MlpConfig,
    ) -> Result<Self> {
        if config.input_size == 0 || config.output_size == 0 || config.hidden_sizes.contains(&0) {
            return Err(Error::Msg(format!(
                "All layer sizes must be positive, got {:?}",
                config.dims(),
            )));
        }

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        let dims = config.dims();
        let mut network = seq();
        let mut names = Vec::with_capacity(2 * dims.len());
        for (i, &(in_dim, out_dim)) in dims.iter().enumerate() {
            network = network.add(linear(in_dim, out_dim, vb.pp(format!("fc{i}")))?);
            names.push(format!("fc{i}.weight"));
            names.push(format!("fc{i}.bias"));
            if i + 1 < dims.len() {
                network = network.add(Activation::Relu);
            }
        }
        if let OutputActivation::Tanh = config.output_activation {
            network = network.add(func(|xs| xs.tanh()));
        }

        Ok(Self {
            config: config.clone(),
            varmap,
            network,
            names,
        })
    }

    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    pub fn forward(
        &self,
        xs: &Tensor,
    ) -> Result<Tensor> {
        self.network.forward(xs)
    }

    /// The variables to hand to an optimizer.
    pub fn trainable_vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    /// The L2 penalty $\frac{\lambda}{2} \sum \theta^2$ over all parameters.
    ///
    /// Its gradient is $\lambda \theta$, the same as coupled weight decay.
    pub fn l2_penalty(
        &self,
        lambda: f64,
    ) -> Result<Tensor> {
        let sums = self
            .trainable_vars()
            .iter()
            .map(|var| var.sqr()?.sum_all())
            .collect::<Result<Vec<_>>>()?;
        Tensor::stack(&sums, 0)?.sum_all()? * (lambda / 2.0)
    }

    /// A detached copy of all parameters, in a fixed layer order.
    pub fn parameters(&self) -> Result<Vec<Tensor>> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|e| Error::Msg(e.to_string()))?;
        self.names
            .iter()
            .map(|name| {
                data.get(name)
                    .ok_or_else(|| Error::Msg(format!("Missing parameter {name}")))?
                    .as_tensor()
                    .copy()
            })
            .collect()
    }

    /// Overwrite all parameters with the given values, in the order of
    /// [`Mlp::parameters`].
    pub fn set_parameters(
        &mut self,
        params: &[Tensor],
    ) -> Result<()> {
        if params.len() != self.names.len() {
            return Err(Error::Msg(format!(
                "Expected {} parameter tensors, got {}",
                self.names.len(),
                params.len(),
            )));
        }
        for (name, value) in self.names.iter().zip(params) {
            self.varmap.set_one(name, value)?;
        }
        Ok(())
    }

    pub fn save<P: AsRef<Path> + ?Sized>(
        &self,
        path: &P,
    ) -> Result<()> {
        self.varmap.save(path)
    }

    pub fn load<P: AsRef<Path> + ?Sized>(
        &mut self,
        path: &P,
    ) -> Result<()> {
        self.varmap.load(path)
    }
}


/// Blend the target parameters towards the online parameters.
///
/// Returns $\tau \theta + (1 - \tau) \theta'$ for every pair of tensors.
pub fn soft_update(
    online: &[Tensor],
    target: &[Tensor],
    tau: f64,
) -> Result<Vec<Tensor>> {
    if !(0.0..=1.0).contains(&tau) {
        return Err(Error::Msg(format!("tau must lie in [0, 1], got {tau}")));
    }
    if online.len() != target.len() {
        return Err(Error::Msg(format!(
            "Cannot blend {} online tensors into {} target tensors",
            online.len(),
            target.len(),
        )));
    }
    online
        .iter()
        .zip(target)
        .map(|(o, t)| (o * tau)? + (t * (1.0 - tau))?)
        .collect()
}

/// Copy the online parameters into the target network.
pub fn hard_update(
    online: &Mlp,
    target: &mut Mlp,
) -> Result<()> {
    target.set_parameters(&online.parameters()?)
}

/// Move the target network towards the online network with rate `tau`.
pub fn track(
    online: &Mlp,
    target: &mut Mlp,
    tau: f64,
) -> Result<()> {
    let blended = soft_update(&online.parameters()?, &target.parameters()?, tau)?;
    target.set_parameters(&blended)
}
