use crate::nn::GraphError;
use crate::nn::nodes::raw_node::TraitNode;
use crate::nn::nodes::{NodeHandle, NodeId};
use crate::tensor::Tensor;

/// 滑窗展开节点：把[batch, C, H, W]展开为[batch, C, P, pH, pW]
///
/// P为滑窗个数（行优先排列），pH/pW为滑窗尺寸。
/// 细节损失的分块Gram矩阵在特征图上用它切出局部patch。
///
/// 反向传播：把每个patch的上游梯度散射累加回输入位置
/// （滑窗重叠时同一输入位置会收到多份梯度）。
#[derive(Clone)]
pub(crate) struct Unfold {
    id: Option<NodeId>,
    name: Option<String>,
    value: Option<Tensor>,
    grad: Option<Tensor>,
    shape: Vec<usize>,
    size: (usize, usize),
    stride: (usize, usize),
}

impl Unfold {
    pub(crate) fn new(
        parents: &[&NodeHandle],
        size: (usize, usize),
        stride: (usize, usize),
    ) -> Result<Self, GraphError> {
        if parents.len() != 1 {
            return Err(GraphError::InvalidOperation(
                "Unfold节点需要1个父节点".to_string(),
            ));
        }
        if size.0 == 0 || size.1 == 0 || stride.0 == 0 || stride.1 == 0 {
            return Err(GraphError::InvalidOperation(
                "Unfold的滑窗尺寸与步长必须大于0".to_string(),
            ));
        }
        let input_shape = parents[0].value_expected_shape();
        if input_shape.len() != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: input_shape.len(),
                message: "Unfold的输入必须是4D [batch, C, H, W]".to_string(),
            });
        }
        let (h, w) = (input_shape[2], input_shape[3]);
        if h < size.0 || w < size.1 {
            return Err(GraphError::InvalidOperation(format!(
                "Unfold的滑窗{size:?}大于输入的空间尺寸{h}x{w}"
            )));
        }
        let patches_h = (h - size.0) / stride.0 + 1;
        let patches_w = (w - size.1) / stride.1 + 1;
        let shape = vec![
            input_shape[0],
            input_shape[1],
            patches_h * patches_w,
            size.0,
            size.1,
        ];
        Ok(Self {
            id: None,
            name: None,
            value: None,
            grad: None,
            shape,
            size,
            stride,
        })
    }

    /// 第p个patch在输入上的左上角坐标
    fn patch_origin(&self, input_w: usize, p: usize) -> (usize, usize) {
        let patches_w = (input_w - self.size.1) / self.stride.1 + 1;
        let ph = p / patches_w;
        let pw = p % patches_w;
        (ph * self.stride.0, pw * self.stride.1)
    }
}

impl TraitNode for Unfold {
    fn id(&self) -> NodeId {
        self.id.unwrap()
    }

    fn set_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<未命名>")
    }

    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn calc_value_by_parents(&mut self, parents: &[&NodeHandle]) -> Result<(), GraphError> {
        let x = parents[0].value().ok_or_else(|| {
            GraphError::ComputationError(format!("{}的父节点{}没有值", self.display_node(), parents[0]))
        })?;
        let in_shape = x.shape();
        let (batch, c, _h, w) = (in_shape[0], in_shape[1], in_shape[2], in_shape[3]);
        let patches = self.shape[2];
        let (p_h, p_w) = self.size;

        let mut out = Tensor::zeros(&self.shape);
        for bi in 0..batch {
            for ci in 0..c {
                for p in 0..patches {
                    let (oh, ow) = self.patch_origin(w, p);
                    for dh in 0..p_h {
                        for dw in 0..p_w {
                            out[[bi, ci, p, dh, dw]] = x[[bi, ci, oh + dh, ow + dw]];
                        }
                    }
                }
            }
        }
        self.value = Some(out);
        Ok(())
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: Option<&Tensor>) -> Result<(), GraphError> {
        self.value = value.cloned();
        Ok(())
    }

    fn calc_grad_to_parent(
        &self,
        target_parent: &NodeHandle,
        upstream_grad: &Tensor,
        _parents: &[&NodeHandle],
    ) -> Result<Tensor, GraphError> {
        let in_shape = target_parent.value_expected_shape();
        let (batch, c, _h, w) = (in_shape[0], in_shape[1], in_shape[2], in_shape[3]);
        let patches = self.shape[2];
        let (p_h, p_w) = self.size;

        let mut grad = Tensor::zeros(in_shape);
        for bi in 0..batch {
            for ci in 0..c {
                for p in 0..patches {
                    let (oh, ow) = self.patch_origin(w, p);
                    for dh in 0..p_h {
                        for dw in 0..p_w {
                            grad[[bi, ci, oh + dh, ow + dw]] +=
                                upstream_grad[[bi, ci, p, dh, dw]];
                        }
                    }
                }
            }
        }
        Ok(grad)
    }

    fn grad(&self) -> Option<&Tensor> {
        self.grad.as_ref()
    }

    fn set_grad(&mut self, grad: Option<&Tensor>) -> Result<(), GraphError> {
        self.grad = grad.cloned();
        Ok(())
    }

    fn clear_value(&mut self) {
        self.value = None;
    }
}
