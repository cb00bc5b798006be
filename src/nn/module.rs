use crate::nn::var::Var;

/// 所有带参数的层/模型的公共接口
pub trait Module {
    /// 返回本模块的全部可训练参数
    fn parameters(&self) -> Vec<Var>;

    /// 可训练参数的标量总数
    fn num_params(&self) -> usize {
        self.parameters()
            .iter()
            .map(|p| p.value().map_or(0, |v| v.size()))
            .sum()
    }
}
