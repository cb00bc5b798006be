/*
 * @Author       : 老董
 * @Date         : 2026-08-14
 * @Description  : SimpleCnn——一个小型图像分类网络：
 *                 Conv(32, 3x3, s2, same) → ReLU → BN
 *                 → Conv(64, 3x3, s2, same) → ReLU → BN
 *                 → Flatten → Linear(128) → ReLU → BN → Dropout(0.5)
 *                 → Linear(classes) → Softmax
 */

use crate::attack::Classifier;
use crate::nn::{
    BatchNorm, Conv2d, Dropout, Graph, GraphError, Linear, Module, Padding, Var,
    VarActivationOps, VarShapeOps,
};

pub struct SimpleCnn {
    graph: Graph,
    conv1: Conv2d,
    bn1: BatchNorm,
    conv2: Conv2d,
    bn2: BatchNorm,
    fc1: Linear,
    bn3: BatchNorm,
    dropout: Dropout,
    fc2: Linear,
    depth: usize,
    height: usize,
    width: usize,
    classes: usize,
}

impl SimpleCnn {
    const CONV1_FILTERS: usize = 32;
    const CONV2_FILTERS: usize = 64;
    const FC1_FEATURES: usize = 128;
    const DROPOUT_RATE: f32 = 0.5;

    pub fn new(
        graph: &Graph,
        width: usize,
        height: usize,
        depth: usize,
        classes: usize,
    ) -> Result<Self, GraphError> {
        let conv1 = Conv2d::new(
            graph,
            depth,
            Self::CONV1_FILTERS,
            (3, 3),
            (2, 2),
            Padding::Same,
            true,
            "conv1",
        )?;
        let bn1 = BatchNorm::new(graph, Self::CONV1_FILTERS, "bn1")?;
        let conv2 = Conv2d::new(
            graph,
            Self::CONV1_FILTERS,
            Self::CONV2_FILTERS,
            (3, 3),
            (2, 2),
            Padding::Same,
            true,
            "conv2",
        )?;
        let bn2 = BatchNorm::new(graph, Self::CONV2_FILTERS, "bn2")?;

        // 两次stride=2的same卷积后，空间尺寸各缩到ceil(ceil(n/2)/2)
        let flatten_dim =
            Self::CONV2_FILTERS * height.div_ceil(2).div_ceil(2) * width.div_ceil(2).div_ceil(2);
        let fc1 = Linear::new(graph, flatten_dim, Self::FC1_FEATURES, true, "fc1")?;
        let bn3 = BatchNorm::new(graph, Self::FC1_FEATURES, "bn3")?;
        let dropout = Dropout::new(Self::DROPOUT_RATE);
        let fc2 = Linear::new(graph, Self::FC1_FEATURES, classes, true, "fc2")?;

        Ok(Self {
            graph: graph.clone(),
            conv1,
            bn1,
            conv2,
            bn2,
            fc1,
            bn3,
            dropout,
            fc2,
            depth,
            height,
            width,
            classes,
        })
    }
}

impl Module for SimpleCnn {
    fn parameters(&self) -> Vec<Var> {
        let mut params = Vec::new();
        params.extend(self.conv1.parameters());
        params.extend(self.bn1.parameters());
        params.extend(self.conv2.parameters());
        params.extend(self.bn2.parameters());
        params.extend(self.fc1.parameters());
        params.extend(self.bn3.parameters());
        params.extend(self.fc2.parameters());
        params
    }
}

impl Classifier for SimpleCnn {
    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn input_shape(&self) -> [usize; 3] {
        [self.depth, self.height, self.width]
    }

    fn num_classes(&self) -> usize {
        self.classes
    }

    fn forward(&self, input: &Var) -> Result<Var, GraphError> {
        let x = self.bn1.forward(&self.conv1.forward(input)?.relu())?;
        let x = self.bn2.forward(&self.conv2.forward(&x)?.relu())?;
        let x = self.bn3.forward(&self.fc1.forward(&x.flatten())?.relu())?;
        let x = self.fc2.forward(&self.dropout.forward(&x)?)?;
        Ok(x.softmax())
    }
}

/// 按给定的输入尺寸与类别数构建分类器（参数随机初始化）
pub fn build_classifier(
    width: usize,
    height: usize,
    depth: usize,
    classes: usize,
) -> Result<SimpleCnn, GraphError> {
    SimpleCnn::new(&Graph::new(), width, height, depth, classes)
}

/// 同 `build_classifier`，但用固定种子初始化参数（结果可重复）
pub fn build_classifier_seeded(
    width: usize,
    height: usize,
    depth: usize,
    classes: usize,
    seed: u64,
) -> Result<SimpleCnn, GraphError> {
    SimpleCnn::new(&Graph::new_with_seed(seed), width, height, depth, classes)
}
