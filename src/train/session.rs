/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : TrainingSession：五个(网络, 优化器, 调度器)三元组的固定字段训练会话
 */

use super::{TrainConfig, TrainError};
use crate::data::{Batch, DataLoader, Dataset};
use crate::losses::{CoarseLoss, DetailsLoss, EdgeLoss};
use crate::models::{
    CoarseNet, DetailsNet, DiscriminatorOne, DiscriminatorTwo, EdgeNet, FeatureNet,
    SegmentationModule,
};
use crate::nn::{Adam, Forward, Graph, Module, Optimizer, StepLR, Var, VarLossOps, VarStyleOps};
use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 一个训练步的五个损失值
#[derive(Debug, Clone, Copy)]
pub struct StepLosses {
    pub coarse: f32,
    pub edge: f32,
    pub details: f32,
    pub disc_one: f32,
    pub disc_two: f32,
}

/// 训练会话
///
/// 构建时一次性接好全部计算图：输入占位、五个网络、冻结协作模块、
/// 五个损失与判别器的真/伪分支。之后每个训练步只做喂值、前向、
/// 分阶段backward与优化器step，不再建任何新节点。
pub struct TrainingSession {
    config: TrainConfig,
    graph: Graph,

    coarse_net: CoarseNet,
    edge_net: EdgeNet,
    details_net: DetailsNet,
    disc_one: DiscriminatorOne,
    disc_two: DiscriminatorTwo,
    segmentation: SegmentationModule,
    feature_net: FeatureNet,

    // 输入占位
    x: Var,
    y_descreen: Var,
    y_edge: Var,

    // 接线好的损失节点
    coarse_loss: Var,
    edge_loss: Var,
    details_loss: Var,
    disc_one_loss: Var,
    disc_two_loss: Var,

    coarse_optimizer: Adam,
    edge_optimizer: Adam,
    details_optimizer: Adam,
    disc_one_optimizer: Adam,
    disc_two_optimizer: Adam,

    coarse_scheduler: StepLR,
    edge_scheduler: StepLR,
    details_scheduler: StepLR,
    disc_one_scheduler: StepLR,
    disc_two_scheduler: StepLR,

    stop_flag: Arc<AtomicBool>,
}

/// 对抗训练中判别器的Adam一阶动量系数
const DISC_BETA_1: f32 = 0.5;

impl TrainingSession {
    /// 分割模块权重随机生成（由种子确定）的会话
    pub fn new(
        config: TrainConfig,
        input_size: (usize, usize),
        base_channels: usize,
        seed: u64,
    ) -> Result<Self, TrainError> {
        let graph = Graph::new();
        let segmentation = SegmentationModule::new_random(&graph, base_channels, seed ^ 0x5e9)?;
        Self::build(graph, segmentation, config, input_size, base_channels, seed)
    }

    /// 分割模块权重来自预训练文件的会话；加载失败即构建失败
    pub fn with_segmentation_weights(
        config: TrainConfig,
        input_size: (usize, usize),
        base_channels: usize,
        seed: u64,
        weights_path: impl AsRef<Path>,
    ) -> Result<Self, TrainError> {
        let graph = Graph::new();
        let segmentation = SegmentationModule::from_file(&graph, weights_path)?;
        Self::build(graph, segmentation, config, input_size, base_channels, seed)
    }

    fn build(
        graph: Graph,
        segmentation: SegmentationModule,
        config: TrainConfig,
        (height, width): (usize, usize),
        base_channels: usize,
        seed: u64,
    ) -> Result<Self, TrainError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let batch = config.batch_size;

        // 1. 输入占位
        let x = Var::input(&graph, &[batch, 3, height, width], "x")?;
        let y_descreen = Var::input(&graph, &[batch, 3, height, width], "y_descreen")?;
        let y_edge = Var::input(&graph, &[batch, 1, height, width], "y_edge")?;

        // 2. 网络
        let coarse_net = CoarseNet::new(&graph, base_channels, &mut rng)?;
        let edge_net = EdgeNet::new(&graph, base_channels, &mut rng)?;
        let details_net = DetailsNet::new(&graph, base_channels, &mut rng)?;
        let disc_one = DiscriminatorOne::new(&graph, base_channels, &mut rng)?;
        let disc_two = DiscriminatorTwo::new(&graph, base_channels, &mut rng)?;
        let feature_net = FeatureNet::new(&graph, base_channels, seed ^ 0xfea7)?;

        // 3. 生成路径：粗糙重建 → 分割概率 → HACE融合 → 细节残差 → 最终重建
        let coarse = coarse_net.forward(&x)?;
        let edges = edge_net.forward(&x)?;
        let seg_probs = segmentation.forward(&coarse)?;
        let hace = Var::concat(&[&x, &coarse, &seg_probs, &edges], Some("hace"))?;
        let details_residual = details_net.forward(&hace)?;
        let details = details_residual.try_add(&coarse, Some("details"))?;
        let details_edges = edge_net.forward(&details)?;

        // 4. 生成器侧损失
        let coarse_loss = CoarseLoss::new().forward(&feature_net, &coarse, &y_descreen)?;
        let edge_loss = EdgeLoss::new().forward(&edges, &y_edge)?;
        let adversarial_score = disc_one.forward(&details_residual)?;
        let details_loss = DetailsLoss::new().forward(
            &feature_net,
            &details,
            &y_descreen,
            &details_edges,
            &y_edge,
            &adversarial_score,
        )?;

        // 5. 一号判别器：真 = y_descreen − coarse（detach），伪 = 细节残差（detach）
        let residual_real = y_descreen.try_sub(&coarse.detach()?, Some("disc_one_real"))?;
        let disc_one_loss = Self::wire_discriminator_loss(
            &graph,
            "disc_one",
            disc_one.forward(&residual_real)?,
            disc_one.forward(&details_residual.detach()?)?,
        )?;

        // 6. 二号判别器（HOD）：真 = {x, y_descreen, y_descreen}，伪 = {x, y_descreen, details（detach）}
        let hod_real = Var::concat(&[&x, &y_descreen, &y_descreen], Some("hod_real"))?;
        let hod_fake = Var::concat(&[&x, &y_descreen, &details.detach()?], Some("hod_fake"))?;
        let disc_two_loss = Self::wire_discriminator_loss(
            &graph,
            "disc_two",
            disc_two.forward(&hod_real)?,
            disc_two.forward(&hod_fake)?,
        )?;

        // 7. 五个(优化器, 调度器)：判别器用GAN惯例的beta1=0.5
        let lr = config.learning_rate;
        let coarse_optimizer = Adam::new(&graph, &coarse_net.parameters(), lr);
        let edge_optimizer = Adam::new(&graph, &edge_net.parameters(), lr);
        let details_optimizer = Adam::new(&graph, &details_net.parameters(), lr);
        let disc_one_optimizer = Adam::with_beta_1(&graph, &disc_one.parameters(), lr, DISC_BETA_1);
        let disc_two_optimizer = Adam::with_beta_1(&graph, &disc_two.parameters(), lr, DISC_BETA_1);

        let lr_decay = config.lr_decay;
        let scheduler = || StepLR::new(1, lr_decay);

        Ok(Self {
            config,
            graph,
            coarse_net,
            edge_net,
            details_net,
            disc_one,
            disc_two,
            segmentation,
            feature_net,
            x,
            y_descreen,
            y_edge,
            coarse_loss,
            edge_loss,
            details_loss,
            disc_one_loss,
            disc_two_loss,
            coarse_optimizer,
            edge_optimizer,
            details_optimizer,
            disc_one_optimizer,
            disc_two_optimizer,
            coarse_scheduler: scheduler(),
            edge_scheduler: scheduler(),
            details_scheduler: scheduler(),
            disc_one_scheduler: scheduler(),
            disc_two_scheduler: scheduler(),
            stop_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 判别器损失：`0.5·(MSE(score_real, 1) + MSE(score_fake, 0))`
    fn wire_discriminator_loss(
        graph: &Graph,
        name: &str,
        real_score: Var,
        fake_score: Var,
    ) -> Result<Var, TrainError> {
        let score_shape = real_score.shape()?;
        let ones = Var::constant(
            graph,
            &Tensor::ones(&score_shape),
            &format!("{name}_real_target"),
        )?;
        let zeros = Var::constant(
            graph,
            &Tensor::zeros(&score_shape),
            &format!("{name}_fake_target"),
        )?;
        let real_term = real_score.mse_loss(&ones)?;
        let fake_term = fake_score.mse_loss(&zeros)?;
        Ok(real_term
            .try_add(&fake_term, None)?
            .scaled(0.5)?)
    }

    /// 执行一个训练步（固定相位顺序的状态机）
    pub fn train_step(&mut self, batch: &Batch) -> Result<StepLosses, TrainError> {
        // 相位1：喂入本批数据，清零粗糙/边缘优化器
        self.x.set_value(&batch.x)?;
        self.y_descreen.set_value(&batch.y_descreen)?;
        self.y_edge.set_value(&batch.y_edge)?;
        self.coarse_optimizer.zero_grad()?;
        self.edge_optimizer.zero_grad()?;

        // 相位2：同一轮前向里算出全部五个损失（中间值共享）
        self.details_loss.forward()?;
        self.disc_one_loss.forward()?;
        self.disc_two_loss.forward()?;
        self.coarse_loss.forward()?;
        self.edge_loss.forward()?;

        let losses = StepLosses {
            coarse: self.coarse_loss.item()?,
            edge: self.edge_loss.item()?,
            details: self.details_loss.item()?,
            disc_one: self.disc_one_loss.item()?,
            disc_two: self.disc_two_loss.item()?,
        };

        // 相位3：有限性闸门——任一损失非有限则在任何优化器更新之前整步中止
        for (name, value) in [
            ("coarse", losses.coarse),
            ("edge", losses.edge),
            ("details", losses.details),
            ("disc_one", losses.disc_one),
            ("disc_two", losses.disc_two),
        ] {
            if !value.is_finite() {
                return Err(TrainError::NonFiniteLoss { name, value });
            }
        }

        // 相位4：生成器（细节）
        self.details_optimizer.zero_grad()?;
        self.details_loss.backward_retain()?;
        self.details_optimizer.step()?;

        // 相位5：一号判别器
        self.disc_one_optimizer.zero_grad()?;
        self.disc_one_loss.backward_retain()?;
        self.disc_one_optimizer.step()?;

        // 相位6：二号判别器
        self.disc_two_optimizer.zero_grad()?;
        self.disc_two_loss.backward_retain()?;
        self.disc_two_optimizer.step()?;

        // 相位7：粗糙网络（包含细节损失经HACE溢入的梯度）
        self.coarse_loss.backward_retain()?;
        self.coarse_optimizer.step()?;

        // 相位8：边缘网络——本步最后一次backward，释放计算图的中间值
        self.edge_loss.backward()?;
        self.edge_optimizer.step()?;

        Ok(losses)
    }

    /// 按配置跑完整训练：每个epoch结束时五个调度器各step一次；
    /// 停止请求只在步与步之间生效，永远不会打断进行中的backward。
    pub fn train<D: Dataset>(
        &mut self,
        dataset: &D,
        shuffle_seed: u64,
    ) -> Result<Vec<StepLosses>, TrainError> {
        let mut loader = DataLoader::new(
            dataset,
            self.config.batch_size,
            true,
            true,
            shuffle_seed,
        )?;
        let mut history = Vec::new();

        for _epoch in 0..self.config.epochs {
            for batch in loader.epoch()? {
                if self.stop_flag.load(Ordering::SeqCst) {
                    return Ok(history);
                }
                history.push(self.train_step(&batch)?);
            }
            self.coarse_scheduler.step(&mut self.coarse_optimizer);
            self.edge_scheduler.step(&mut self.edge_optimizer);
            self.details_scheduler.step(&mut self.details_optimizer);
            self.disc_one_scheduler.step(&mut self.disc_one_optimizer);
            self.disc_two_scheduler.step(&mut self.disc_two_optimizer);
        }
        Ok(history)
    }

    /// 停止句柄：其他线程置位后，训练会在下一个步边界干净退出
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// 保存全部可训练参数（五个网络）到检查点文件
    pub fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<(), TrainError> {
        Ok(self.graph.save_params(path)?)
    }

    /// 从检查点恢复参数（拓扑必须与保存时一致）
    pub fn load_checkpoint(&mut self, path: impl AsRef<Path>) -> Result<(), TrainError> {
        Ok(self.graph.load_params(path)?)
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn coarse_net(&self) -> &CoarseNet {
        &self.coarse_net
    }

    pub fn edge_net(&self) -> &EdgeNet {
        &self.edge_net
    }

    pub fn details_net(&self) -> &DetailsNet {
        &self.details_net
    }

    pub fn disc_one(&self) -> &DiscriminatorOne {
        &self.disc_one
    }

    pub fn disc_two(&self) -> &DiscriminatorTwo {
        &self.disc_two
    }

    pub fn segmentation(&self) -> &SegmentationModule {
        &self.segmentation
    }

    pub fn feature_net(&self) -> &FeatureNet {
        &self.feature_net
    }
}
